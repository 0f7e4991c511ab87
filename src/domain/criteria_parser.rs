//! Parser for the small declarative languages used in configuration:
//!
//! - preset criteria: `pe > 0, pe < 15, pb <= 1.5`
//! - preset weights: `pe:lower:0.3, dividend_yield:higher:0.2:4`
//! - shock definitions: `price=-20%, rates=+100bp, sector.technology=-10%`
//!
//! Errors carry the character offset into the original text.

use crate::domain::error::ParseError;
use crate::domain::fundamentals::MetricKind;
use crate::domain::preset::{Comparison, Direction, Threshold, WeightedMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Plain,
    Percent,
    BasisPoints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShockEntry {
    pub key: String,
    pub value: f64,
    pub unit: Unit,
    pub position: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.peek().is_none()
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    /// Consume a list separator, returning false at end of input.
    fn next_item(&mut self) -> Result<bool, ParseError> {
        if self.at_end() {
            return Ok(false);
        }
        self.expect_char(',')?;
        if self.at_end() {
            return Err(self.error("expected entry after ','".into()));
        }
        Ok(true)
    }

    fn parse_word(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '/' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error(format!("expected identifier, found {}", self.found())));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_metric(&mut self) -> Result<MetricKind, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.parse_word()?;
        MetricKind::parse(&word).ok_or(ParseError {
            message: format!("unknown metric '{}'", word),
            position: start,
        })
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }
        let mut digits = 0;
        let mut has_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        if digits == 0 {
            self.pos = start;
            return Err(self.error(format!("expected number, found {}", self.found())));
        }
        self.input[start..self.pos].parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number '{}'", &self.input[start..self.pos]),
            position: start,
        })
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        self.skip_whitespace();
        let op = match self.peek() {
            Some('<') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Comparison::AtMost
                } else {
                    Comparison::LessThan
                }
            }
            Some('>') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Comparison::AtLeast
                } else {
                    Comparison::GreaterThan
                }
            }
            _ => {
                return Err(self.error(format!(
                    "expected comparison operator, found {}",
                    self.found()
                )))
            }
        };
        Ok(op)
    }

    fn parse_unit(&mut self) -> Unit {
        self.skip_whitespace();
        if self.remaining().starts_with('%') {
            self.advance();
            Unit::Percent
        } else if self.remaining().to_lowercase().starts_with("bp") {
            self.pos += 2;
            Unit::BasisPoints
        } else {
            Unit::Plain
        }
    }

    fn parse_threshold(&mut self) -> Result<Threshold, ParseError> {
        let metric = self.parse_metric()?;
        let comparison = self.parse_comparison()?;
        let value = self.parse_number()?;
        Ok(Threshold {
            metric,
            comparison,
            value,
        })
    }

    fn parse_weight(&mut self) -> Result<WeightedMetric, ParseError> {
        let metric = self.parse_metric()?;
        self.expect_char(':')?;
        self.skip_whitespace();
        let dir_pos = self.pos;
        let direction = match self.parse_word()?.to_lowercase().as_str() {
            "lower" | "low" | "asc" => Direction::LowerIsBetter,
            "higher" | "high" | "desc" => Direction::HigherIsBetter,
            other => {
                return Err(ParseError {
                    message: format!("expected 'lower' or 'higher', found '{}'", other),
                    position: dir_pos,
                })
            }
        };
        self.expect_char(':')?;
        let weight_pos = self.pos;
        let weight = self.parse_number()?;
        if weight <= 0.0 {
            return Err(ParseError {
                message: "weight must be positive".into(),
                position: weight_pos,
            });
        }
        self.skip_whitespace();
        let reference = if self.peek() == Some(':') {
            self.advance();
            let ref_pos = self.pos;
            let r = self.parse_number()?;
            if r <= 0.0 {
                return Err(ParseError {
                    message: "reference must be positive".into(),
                    position: ref_pos,
                });
            }
            Some(r)
        } else {
            None
        };
        Ok(WeightedMetric {
            metric,
            direction,
            weight,
            reference,
        })
    }

    fn parse_shock(&mut self) -> Result<ShockEntry, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '=' || ch == ',' {
                break;
            }
            self.advance();
        }
        let key = self.input[start..self.pos].trim().to_lowercase();
        if key.is_empty() {
            return Err(ParseError {
                message: format!("expected shock name, found {}", self.found()),
                position: start,
            });
        }
        self.expect_char('=')?;
        let value = self.parse_number()?;
        let unit = self.parse_unit();
        Ok(ShockEntry {
            key,
            value,
            unit,
            position: start,
        })
    }
}

pub fn parse_criteria(input: &str) -> Result<Vec<Threshold>, ParseError> {
    let mut parser = Parser::new(input);
    let mut out = Vec::new();
    if parser.at_end() {
        return Ok(out);
    }
    loop {
        out.push(parser.parse_threshold()?);
        if !parser.next_item()? {
            break;
        }
    }
    Ok(out)
}

pub fn parse_weights(input: &str) -> Result<Vec<WeightedMetric>, ParseError> {
    let mut parser = Parser::new(input);
    if parser.at_end() {
        return Err(parser.error("expected at least one weighted metric".into()));
    }
    let mut out = Vec::new();
    loop {
        out.push(parser.parse_weight()?);
        if !parser.next_item()? {
            break;
        }
    }
    Ok(out)
}

pub fn parse_shocks(input: &str) -> Result<Vec<ShockEntry>, ParseError> {
    let mut parser = Parser::new(input);
    if parser.at_end() {
        return Err(parser.error("expected at least one shock".into()));
    }
    let mut out = Vec::new();
    loop {
        out.push(parser.parse_shock()?);
        if !parser.next_item()? {
            break;
        }
    }
    Ok(out)
}

/// Parse a single amount such as `-20%`, `+100bp` or `0.5`.
pub fn parse_amount(input: &str) -> Result<(f64, Unit), ParseError> {
    let mut parser = Parser::new(input);
    let value = parser.parse_number()?;
    let unit = parser.parse_unit();
    if !parser.at_end() {
        return Err(parser.error(format!("unexpected {}", parser.found())));
    }
    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_criteria_list() {
        let t = parse_criteria("pe > 0, pe < 15, pb <= 1.5, dividend_yield >= 3").unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t[0].metric, MetricKind::PeRatio);
        assert_eq!(t[0].comparison, Comparison::GreaterThan);
        assert_eq!(t[2].comparison, Comparison::AtMost);
        assert_eq!(t[3].metric, MetricKind::DividendYield);
        assert_eq!(t[3].value, 3.0);
    }

    #[test]
    fn empty_criteria_is_allowed() {
        assert!(parse_criteria("   ").unwrap().is_empty());
    }

    #[test]
    fn criteria_unknown_metric_reports_position() {
        let err = parse_criteria("pe < 10, ev_ebitda < 5").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.contains("ev_ebitda"));
    }

    #[test]
    fn criteria_missing_operator() {
        let err = parse_criteria("pe 10").unwrap_err();
        assert!(err.message.contains("comparison operator"));
        assert_eq!(err.position, 3);
    }

    #[test]
    fn trailing_comma_is_rejected() {
        assert!(parse_criteria("pe < 10,").is_err());
    }

    #[test]
    fn parses_weights_with_optional_reference() {
        let w = parse_weights("pe:lower:0.4, roe:higher:0.6:12").unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].direction, Direction::LowerIsBetter);
        assert_eq!(w[0].reference, None);
        assert_eq!(w[1].direction, Direction::HigherIsBetter);
        assert_eq!(w[1].reference, Some(12.0));
    }

    #[test]
    fn weights_reject_zero_weight_and_bad_direction() {
        assert!(parse_weights("pe:lower:0").is_err());
        let err = parse_weights("pe:sideways:1").unwrap_err();
        assert!(err.message.contains("sideways"));
        assert!(parse_weights("").is_err());
    }

    #[test]
    fn parses_shock_list() {
        let s = parse_shocks("price=-20%, rates=+100bp, sector.Real Estate=-5%").unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s[0].key, "price");
        assert_eq!(s[0].value, -20.0);
        assert_eq!(s[0].unit, Unit::Percent);
        assert_eq!(s[1].unit, Unit::BasisPoints);
        assert_eq!(s[1].value, 100.0);
        assert_eq!(s[2].key, "sector.real estate");
    }

    #[test]
    fn shock_without_value_fails() {
        let err = parse_shocks("price=").unwrap_err();
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn parses_single_amounts() {
        assert_eq!(parse_amount("-20%").unwrap(), (-20.0, Unit::Percent));
        assert_eq!(parse_amount("+50 bp").unwrap(), (50.0, Unit::BasisPoints));
        assert_eq!(parse_amount("0.25").unwrap(), (0.25, Unit::Plain));
        assert!(parse_amount("-20% extra").is_err());
    }
}
