//! Raw provider fundamentals and the canonical per-security metric record.
//!
//! Every derived field is a [`MetricValue`]: either a finite number or an
//! explicit `Undefined` carrying the reason it could not be derived.
//! Consumers branch on the variant; nothing silently defaults to zero.

use chrono::NaiveDate;
use std::fmt;

/// Per-security fundamentals as supplied by a market data provider.
/// Any numeric field may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFundamentals {
    pub symbol: String,
    pub currency: String,
    pub price: Option<f64>,
    pub eps: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub dividend_per_share: Option<f64>,
    /// Return on equity as a fraction (0.12 = 12%).
    pub roe: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub as_of: Option<NaiveDate>,
}

impl RawFundamentals {
    pub fn new(symbol: &str, currency: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            currency: currency.to_uppercase(),
            price: None,
            eps: None,
            book_value_per_share: None,
            dividend_per_share: None,
            roe: None,
            market_cap: None,
            sector: None,
            as_of: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    PeRatio,
    PbRatio,
    DividendYield,
    Roe,
    MarketValue,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::PeRatio,
        MetricKind::PbRatio,
        MetricKind::DividendYield,
        MetricKind::Roe,
        MetricKind::MarketValue,
    ];

    /// Accepts the config spellings used in preset definitions.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pe" | "per" | "p/e" | "pe_ratio" => Some(MetricKind::PeRatio),
            "pb" | "pbr" | "p/b" | "pb_ratio" => Some(MetricKind::PbRatio),
            "dividend_yield" | "yield" | "dy" => Some(MetricKind::DividendYield),
            "roe" => Some(MetricKind::Roe),
            "market_value" | "market_cap" | "mv" => Some(MetricKind::MarketValue),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::PeRatio => "P/E",
            MetricKind::PbRatio => "P/B",
            MetricKind::DividendYield => "Dividend yield",
            MetricKind::Roe => "ROE",
            MetricKind::MarketValue => "Market value",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            MetricKind::PeRatio => "pe",
            MetricKind::PbRatio => "pb",
            MetricKind::DividendYield => "dividend_yield",
            MetricKind::Roe => "roe",
            MetricKind::MarketValue => "market_value",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UndefinedReason {
    /// An input was absent from the provider response.
    Missing,
    /// Denominator was zero or negative (e.g. loss-making earnings).
    NonPositiveDenominator,
    /// Value was computed but outside the plausible range and discarded.
    Anomalous,
    /// No conversion rate to the reporting currency.
    NoFxRate,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::Missing => "missing input",
            UndefinedReason::NonPositiveDenominator => "non-positive denominator",
            UndefinedReason::Anomalous => "anomalous value",
            UndefinedReason::NoFxRate => "no fx rate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Defined(v) => Some(*v),
            MetricValue::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MetricValue::Defined(_))
    }

    /// Wraps a computed number, refusing NaN and infinities.
    pub fn finite(v: f64) -> Self {
        if v.is_finite() {
            MetricValue::Defined(v)
        } else {
            MetricValue::Undefined(UndefinedReason::Anomalous)
        }
    }
}

/// Which canonical fields were derivable for a security.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completeness {
    pub derived: Vec<MetricKind>,
    pub undefined: Vec<(MetricKind, UndefinedReason)>,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.undefined.is_empty()
    }
}

/// Canonical, comparable metrics for one (symbol, as-of) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMetric {
    pub symbol: String,
    pub as_of: Option<NaiveDate>,
    pub currency: String,
    /// Last price in the security's own currency.
    pub price: MetricValue,
    pub pe_ratio: MetricValue,
    pub pb_ratio: MetricValue,
    /// Trailing dividend yield in percent.
    pub dividend_yield: MetricValue,
    /// Return on equity in percent.
    pub roe: MetricValue,
    /// Market capitalisation in the reporting currency.
    pub market_value: MetricValue,
    /// Rate from `currency` into the reporting currency.
    pub fx_rate: MetricValue,
    pub dividend_per_share: Option<f64>,
    pub sector: Option<String>,
    pub completeness: Completeness,
}

impl CanonicalMetric {
    pub fn get(&self, kind: MetricKind) -> MetricValue {
        match kind {
            MetricKind::PeRatio => self.pe_ratio,
            MetricKind::PbRatio => self.pb_ratio,
            MetricKind::DividendYield => self.dividend_yield,
            MetricKind::Roe => self.roe,
            MetricKind::MarketValue => self.market_value,
        }
    }
}
