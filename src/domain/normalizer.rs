//! Normalizer: raw provider fundamentals into [`CanonicalMetric`].
//!
//! Ratios are only produced when the denominator makes them economically
//! meaningful; everything else becomes an explicit `Undefined`. Provider
//! anomalies (special dividends, accounting one-offs) are discarded using
//! fixed plausibility bounds.

use std::collections::HashMap;

use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::{
    CanonicalMetric, Completeness, MetricKind, MetricValue, RawFundamentals, UndefinedReason,
};

/// Dividend yields above this (percent) come from special dividends.
pub const MAX_DIVIDEND_YIELD_PCT: f64 = 15.0;
pub const MIN_PB_RATIO: f64 = 0.05;
/// P/E between zero and this is treated as a one-off earnings distortion.
pub const MIN_PE_RATIO: f64 = 1.0;
pub const MIN_ROE_PCT: f64 = -100.0;
pub const MAX_ROE_PCT: f64 = 200.0;

/// Conversion rates into a single reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct FxTable {
    reporting_currency: String,
    rates: HashMap<String, f64>,
}

impl FxTable {
    pub fn new(reporting_currency: &str) -> Self {
        Self {
            reporting_currency: reporting_currency.to_uppercase(),
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, currency: &str, rate: f64) -> Self {
        self.insert(currency, rate);
        self
    }

    /// Non-finite or non-positive rates are ignored.
    pub fn insert(&mut self, currency: &str, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rates.insert(currency.to_uppercase(), rate);
        }
    }

    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        let currency = currency.to_uppercase();
        if currency == self.reporting_currency {
            return Some(1.0);
        }
        self.rates.get(&currency).copied()
    }
}

pub fn normalize(raw: &RawFundamentals, fx: &FxTable) -> Result<CanonicalMetric, ValuescopeError> {
    validate_raw(raw)?;

    let price = match raw.price {
        None => MetricValue::Undefined(UndefinedReason::Missing),
        Some(p) if p == 0.0 => MetricValue::Undefined(UndefinedReason::Anomalous),
        Some(p) => MetricValue::Defined(p),
    };

    let pe_ratio = sanitize(
        positive_ratio(price, raw.eps),
        |pe| pe >= MIN_PE_RATIO,
    );
    let pb_ratio = sanitize(
        positive_ratio(price, raw.book_value_per_share),
        |pb| pb >= MIN_PB_RATIO,
    );

    let dividend_yield = match (raw.dividend_per_share, price) {
        (None, _) => MetricValue::Undefined(UndefinedReason::Missing),
        (Some(_), MetricValue::Undefined(reason)) => MetricValue::Undefined(reason),
        (Some(dps), MetricValue::Defined(p)) => sanitize(MetricValue::finite(dps / p * 100.0), |y| {
            y <= MAX_DIVIDEND_YIELD_PCT
        }),
    };

    let roe = match raw.roe {
        None => MetricValue::Undefined(UndefinedReason::Missing),
        Some(r) => sanitize(MetricValue::finite(r * 100.0), |pct| {
            (MIN_ROE_PCT..=MAX_ROE_PCT).contains(&pct)
        }),
    };

    let fx_rate = match fx.rate(&raw.currency) {
        Some(rate) => MetricValue::Defined(rate),
        None => MetricValue::Undefined(UndefinedReason::NoFxRate),
    };

    let market_value = match (raw.market_cap, fx_rate) {
        (None, _) => MetricValue::Undefined(UndefinedReason::Missing),
        (Some(_), MetricValue::Undefined(reason)) => MetricValue::Undefined(reason),
        (Some(cap), MetricValue::Defined(rate)) => MetricValue::finite(cap * rate),
    };

    let mut metric = CanonicalMetric {
        symbol: raw.symbol.clone(),
        as_of: raw.as_of,
        currency: raw.currency.to_uppercase(),
        price,
        pe_ratio,
        pb_ratio,
        dividend_yield,
        roe,
        market_value,
        fx_rate,
        dividend_per_share: raw.dividend_per_share,
        sector: raw
            .sector
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        completeness: Completeness::default(),
    };
    metric.completeness = completeness_of(&metric);
    Ok(metric)
}

fn validate_raw(raw: &RawFundamentals) -> Result<(), ValuescopeError> {
    let invalid = |reason: String| ValuescopeError::InvalidData {
        symbol: raw.symbol.clone(),
        reason,
    };

    let fields = [
        ("price", raw.price),
        ("eps", raw.eps),
        ("bps", raw.book_value_per_share),
        ("dps", raw.dividend_per_share),
        ("roe", raw.roe),
        ("market_cap", raw.market_cap),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(invalid(format!("{} is not a finite number", name)));
            }
        }
    }

    if raw.price.is_some_and(|p| p < 0.0) {
        return Err(invalid("negative price".into()));
    }
    if raw.dividend_per_share.is_some_and(|d| d < 0.0) {
        return Err(invalid("negative dividend".into()));
    }
    if raw.market_cap.is_some_and(|m| m < 0.0) {
        return Err(invalid("negative market cap".into()));
    }
    if raw.currency.trim().is_empty() {
        return Err(invalid("missing currency".into()));
    }
    Ok(())
}

/// price / denominator, defined only for a positive denominator.
fn positive_ratio(price: MetricValue, denominator: Option<f64>) -> MetricValue {
    match (price, denominator) {
        (_, None) => MetricValue::Undefined(UndefinedReason::Missing),
        (MetricValue::Undefined(reason), Some(_)) => MetricValue::Undefined(reason),
        (MetricValue::Defined(_), Some(d)) if d <= 0.0 => {
            MetricValue::Undefined(UndefinedReason::NonPositiveDenominator)
        }
        (MetricValue::Defined(p), Some(d)) => MetricValue::finite(p / d),
    }
}

fn sanitize(value: MetricValue, plausible: impl Fn(f64) -> bool) -> MetricValue {
    match value {
        MetricValue::Defined(v) if !plausible(v) => {
            MetricValue::Undefined(UndefinedReason::Anomalous)
        }
        other => other,
    }
}

fn completeness_of(metric: &CanonicalMetric) -> Completeness {
    let mut completeness = Completeness::default();
    for kind in MetricKind::ALL {
        match metric.get(kind) {
            MetricValue::Defined(_) => completeness.derived.push(kind),
            MetricValue::Undefined(reason) => completeness.undefined.push((kind, reason)),
        }
    }
    completeness
}
