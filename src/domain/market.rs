//! Market regimes and symbol classification.
//!
//! Symbols are market-qualified by exchange suffix (`7203.T`, `D05.SI`);
//! an unsuffixed symbol is a US listing.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Market {
    Japan,
    Us,
    Asean,
}

const JAPAN_SUFFIXES: [&str; 4] = [".T", ".S", ".N", ".F"];
const ASEAN_SUFFIXES: [&str; 6] = [".SI", ".BK", ".KL", ".JK", ".PS", ".VN"];

impl Market {
    pub const ALL: [Market; 3] = [Market::Japan, Market::Us, Market::Asean];

    pub fn classify(symbol: &str) -> Market {
        let upper = symbol.trim().to_uppercase();
        if JAPAN_SUFFIXES.iter().any(|s| upper.ends_with(s)) {
            Market::Japan
        } else if ASEAN_SUFFIXES.iter().any(|s| upper.ends_with(s)) {
            Market::Asean
        } else {
            Market::Us
        }
    }

    /// Turn a user-supplied code into a provider ticker. A bare Japanese
    /// securities code gets the Tokyo suffix.
    pub fn format_ticker(&self, code: &str) -> String {
        let code = code.trim().to_uppercase();
        match self {
            Market::Japan if !code.contains('.') => format!("{}.T", code),
            _ => code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Market::Japan => "japan",
            Market::Us => "us",
            Market::Asean => "asean",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFilter {
    Only(Market),
    All,
}

impl MarketFilter {
    pub fn includes(&self, market: Market) -> bool {
        match self {
            MarketFilter::Only(m) => *m == market,
            MarketFilter::All => true,
        }
    }

    pub fn includes_symbol(&self, symbol: &str) -> bool {
        self.includes(Market::classify(symbol))
    }

    pub fn markets(&self) -> Vec<Market> {
        match self {
            MarketFilter::Only(m) => vec![*m],
            MarketFilter::All => Market::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown market '{0}' (expected japan, us, asean or all)")]
pub struct UnknownMarket(pub String);

impl FromStr for MarketFilter {
    type Err = UnknownMarket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "japan" | "jp" => Ok(MarketFilter::Only(Market::Japan)),
            "us" | "usa" => Ok(MarketFilter::Only(Market::Us)),
            "asean" => Ok(MarketFilter::Only(Market::Asean)),
            "all" => Ok(MarketFilter::All),
            other => Err(UnknownMarket(other.to_string())),
        }
    }
}

impl fmt::Display for MarketFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketFilter::Only(m) => write!(f, "{}", m),
            MarketFilter::All => f.write_str("all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_suffix() {
        assert_eq!(Market::classify("7203.T"), Market::Japan);
        assert_eq!(Market::classify("8306.t"), Market::Japan);
        assert_eq!(Market::classify("D05.SI"), Market::Asean);
        assert_eq!(Market::classify("PTT.BK"), Market::Asean);
        assert_eq!(Market::classify("AAPL"), Market::Us);
        assert_eq!(Market::classify("BRK-B"), Market::Us);
    }

    #[test]
    fn japan_codes_get_tokyo_suffix() {
        assert_eq!(Market::Japan.format_ticker("7203"), "7203.T");
        assert_eq!(Market::Japan.format_ticker("7203.T"), "7203.T");
        assert_eq!(Market::Us.format_ticker(" aapl "), "AAPL");
        assert_eq!(Market::Asean.format_ticker("d05.si"), "D05.SI");
    }

    #[test]
    fn filter_parses_and_includes() {
        let all: MarketFilter = "all".parse().unwrap();
        assert!(all.includes(Market::Japan));
        assert!(all.includes(Market::Asean));
        assert_eq!(all.markets().len(), 3);

        let us: MarketFilter = "US".parse().unwrap();
        assert!(us.includes_symbol("MSFT"));
        assert!(!us.includes_symbol("7203.T"));
    }

    #[test]
    fn filter_rejects_unknown_market() {
        let err = "europe".parse::<MarketFilter>().unwrap_err();
        assert_eq!(err, UnknownMarket("europe".into()));
    }
}
