//! Scenario Engine: propagates a shock scenario through held positions.
//!
//! Each holding moves through three stages: priced (current price and
//! conversion rate resolved), shocked (scenario factors applied to price,
//! yield and currency), valued (delta against the current value). A holding
//! that cannot be priced is reported as unshockable, so every holding in the
//! input appears exactly once in the result.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::{CanonicalMetric, MetricValue, UndefinedReason};
use crate::domain::holding::Holding;
use crate::domain::normalizer::FxTable;
use crate::domain::scenario::{RateSensitivity, Scenario, ScenarioRegistry};

pub const DEFAULT_CONCENTRATION_THRESHOLD: f64 = 0.25;
pub const DEFAULT_WORST_K: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct StressSettings {
    /// Post-shock weight above which a holding is flagged.
    pub concentration_threshold: f64,
    pub worst_k: usize,
    pub rate_sensitivity: RateSensitivity,
}

impl Default for StressSettings {
    fn default() -> Self {
        Self {
            concentration_threshold: DEFAULT_CONCENTRATION_THRESHOLD,
            worst_k: DEFAULT_WORST_K,
            rate_sensitivity: RateSensitivity::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingImpact {
    pub symbol: String,
    pub sector: Option<String>,
    pub is_cash: bool,
    pub quantity: f64,
    pub price: f64,
    pub shocked_price: f64,
    pub prior_value: f64,
    pub shocked_value: f64,
    pub value_delta: f64,
    /// Delta as a fraction of the pre-shock portfolio value.
    pub portfolio_impact: f64,
    /// Share of the post-shock portfolio value.
    pub shocked_weight: f64,
    pub shocked_dividend_yield: MetricValue,
    pub unrealized_pnl_before: Option<f64>,
    pub unrealized_pnl_after: Option<f64>,
    pub concentrated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnshockableHolding {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub scenario: String,
    pub reporting_currency: String,
    pub holdings: Vec<HoldingImpact>,
    pub unshockable: Vec<UnshockableHolding>,
    pub total_value_before: f64,
    pub total_value_after: f64,
    pub aggregate_delta: f64,
    /// Aggregate delta as a fraction of `total_value_before`.
    pub percent_impact: f64,
    pub worst_contributors: Vec<HoldingImpact>,
    pub concentration_threshold: f64,
}

impl ScenarioResult {
    pub fn concentrated(&self) -> impl Iterator<Item = &HoldingImpact> {
        self.holdings.iter().filter(|h| h.concentrated)
    }

    pub fn holding_count(&self) -> usize {
        self.holdings.len() + self.unshockable.len()
    }
}

struct PricedHolding<'a> {
    holding: &'a Holding,
    /// Currency the price is quoted in.
    currency: String,
    sector: Option<String>,
    price: f64,
    fx: f64,
    dividend_per_share: Option<f64>,
}

struct ShockedHolding<'a> {
    priced: PricedHolding<'a>,
    shocked_price: f64,
    shocked_fx: f64,
}

/// Resolve `name` in the registry, then apply it. An unknown name fails
/// before any holding is touched.
pub fn apply_named_scenario(
    holdings: &[Holding],
    metrics: &HashMap<String, CanonicalMetric>,
    registry: &ScenarioRegistry,
    name: &str,
    fx: &FxTable,
    settings: &StressSettings,
) -> Result<ScenarioResult, ValuescopeError> {
    let scenario = registry.get(name)?;
    Ok(apply_scenario(holdings, metrics, scenario, fx, settings))
}

/// Symbols match case-insensitively between `holdings` and `metrics`.
pub fn apply_scenario(
    holdings: &[Holding],
    metrics: &HashMap<String, CanonicalMetric>,
    scenario: &Scenario,
    fx: &FxTable,
    settings: &StressSettings,
) -> ScenarioResult {
    let by_symbol: HashMap<String, &CanonicalMetric> = metrics
        .iter()
        .map(|(symbol, metric)| (canonical_symbol(symbol), metric))
        .collect();
    let mut shocked = Vec::with_capacity(holdings.len());
    let mut unshockable = Vec::new();

    for holding in holdings {
        match price_holding(holding, &by_symbol, fx) {
            Ok(priced) => shocked.push(shock(priced, scenario, &settings.rate_sensitivity)),
            Err(reason) => unshockable.push(UnshockableHolding {
                symbol: holding.symbol.clone(),
                reason,
            }),
        }
    }

    let total_value_before: f64 = shocked.iter().map(prior_value).sum();
    let total_value_after: f64 = shocked.iter().map(shocked_value).sum();

    let impacts: Vec<HoldingImpact> = shocked
        .iter()
        .map(|s| {
            value(
                s,
                fx,
                total_value_before,
                total_value_after,
                settings.concentration_threshold,
            )
        })
        .collect();

    let aggregate_delta: f64 = impacts.iter().map(|h| h.value_delta).sum();
    let percent_impact = if total_value_before > 0.0 {
        aggregate_delta / total_value_before
    } else {
        0.0
    };

    let mut worst = impacts.clone();
    worst.sort_by(|a, b| {
        b.value_delta
            .abs()
            .total_cmp(&a.value_delta.abs())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    worst.truncate(settings.worst_k);

    ScenarioResult {
        scenario: scenario.name.clone(),
        reporting_currency: fx.reporting_currency().to_string(),
        holdings: impacts,
        unshockable,
        total_value_before,
        total_value_after,
        aggregate_delta,
        percent_impact,
        worst_contributors: worst,
        concentration_threshold: settings.concentration_threshold,
    }
}

fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn price_holding<'a>(
    holding: &'a Holding,
    metrics: &HashMap<String, &CanonicalMetric>,
    fx: &FxTable,
) -> Result<PricedHolding<'a>, String> {
    if !holding.quantity.is_finite() {
        return Err("invalid quantity".to_string());
    }

    if let Some(currency) = holding.cash_currency() {
        let rate = fx
            .rate(&currency)
            .ok_or_else(|| format!("no fx rate for {}", currency))?;
        return Ok(PricedHolding {
            holding,
            currency,
            sector: None,
            price: 1.0,
            fx: rate,
            dividend_per_share: None,
        });
    }

    let metric = metrics
        .get(&canonical_symbol(&holding.symbol))
        .ok_or_else(|| "no metric available".to_string())?;
    let price = match metric.price {
        MetricValue::Defined(p) => p,
        MetricValue::Undefined(reason) => return Err(format!("price undefined ({})", reason)),
    };
    let rate = match metric.fx_rate {
        MetricValue::Defined(r) => r,
        MetricValue::Undefined(_) => return Err(format!("no fx rate for {}", metric.currency)),
    };
    Ok(PricedHolding {
        holding,
        currency: metric.currency.clone(),
        sector: metric.sector.clone(),
        price,
        fx: rate,
        dividend_per_share: metric.dividend_per_share,
    })
}

fn shock<'a>(
    priced: PricedHolding<'a>,
    scenario: &Scenario,
    sensitivity: &RateSensitivity,
) -> ShockedHolding<'a> {
    let shocked_fx = priced.fx * (1.0 + scenario.fx_shock(&priced.currency)).max(0.0);

    if priced.holding.is_cash() {
        let shocked_price = priced.price;
        return ShockedHolding {
            priced,
            shocked_price,
            shocked_fx,
        };
    }

    let sector = priced.sector.as_deref();
    let rate_effect = sensitivity.for_sector(sector) / 100.0 * scenario.rates_bp / 100.0;
    let factor = (1.0 + scenario.price_shock + scenario.sector_shock(sector) + rate_effect).max(0.0);
    let shocked_price = priced.price * factor;
    ShockedHolding {
        priced,
        shocked_price,
        shocked_fx,
    }
}

fn prior_value(s: &ShockedHolding<'_>) -> f64 {
    s.priced.holding.quantity * s.priced.price * s.priced.fx
}

fn shocked_value(s: &ShockedHolding<'_>) -> f64 {
    s.priced.holding.quantity * s.shocked_price * s.shocked_fx
}

fn value(
    s: &ShockedHolding<'_>,
    fx: &FxTable,
    total_before: f64,
    total_after: f64,
    concentration_threshold: f64,
) -> HoldingImpact {
    let holding = s.priced.holding;
    let prior = prior_value(s);
    let after = shocked_value(s);
    let delta = after - prior;

    let shocked_weight = if total_after > 0.0 { after / total_after } else { 0.0 };

    let shocked_dividend_yield = match s.priced.dividend_per_share {
        None => MetricValue::Undefined(UndefinedReason::Missing),
        Some(_) if s.shocked_price <= 0.0 => {
            MetricValue::Undefined(UndefinedReason::NonPositiveDenominator)
        }
        Some(dps) => MetricValue::finite(dps / s.shocked_price * 100.0),
    };

    let cost = if holding.is_cash() {
        None
    } else {
        fx.rate(&holding.currency).map(|rate| holding.cost_value() * rate)
    };

    HoldingImpact {
        symbol: holding.symbol.clone(),
        sector: s.priced.sector.clone(),
        is_cash: holding.is_cash(),
        quantity: holding.quantity,
        price: s.priced.price,
        shocked_price: s.shocked_price,
        prior_value: prior,
        shocked_value: after,
        value_delta: delta,
        portfolio_impact: if total_before > 0.0 { delta / total_before } else { 0.0 },
        shocked_weight,
        shocked_dividend_yield,
        unrealized_pnl_before: cost.map(|c| prior - c),
        unrealized_pnl_after: cost.map(|c| after - c),
        concentrated: shocked_weight.partial_cmp(&concentration_threshold) == Some(Ordering::Greater),
    }
}
