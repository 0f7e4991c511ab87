//! Stress scenarios: declarative shock definitions.
//!
//! A scenario is built from a `[scenario.<name>]` section, where each key
//! names a shock target and each value is an amount:
//!
//! ```ini
//! [scenario.rate-shock]
//! description = Rates up 100bp
//! price = -5%
//! rates = +100bp
//! sector.real estate = -10%
//! fx.usd = -8%
//! ```
//!
//! or from inline text (`price=-20%, rates=+100bp`) on the command line.

use std::collections::BTreeMap;

use crate::domain::criteria_parser::{ShockEntry, Unit, parse_amount, parse_shocks};
use crate::domain::error::{ParseError, ValuescopeError};
use crate::ports::config_port::ConfigPort;

pub const SCENARIO_SECTION_PREFIX: &str = "scenario.";
pub const RATE_SENSITIVITY_SECTION: &str = "rate_sensitivity";
pub const INLINE_SCENARIO_NAME: &str = "custom";

/// Price change in percent per +100bp when no sector entry matches.
pub const DEFAULT_RATE_SENSITIVITY: f64 = -2.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    /// Market-wide price change as a fraction (-0.2 = -20%).
    pub price_shock: f64,
    pub rates_bp: f64,
    /// Lowercased sector name to additional price change fraction.
    pub sector_shocks: BTreeMap<String, f64>,
    /// Uppercased currency to change in its value against the reporting
    /// currency, as a fraction.
    pub fx_shocks: BTreeMap<String, f64>,
}

impl Scenario {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn parse_inline(text: &str) -> Result<Self, ValuescopeError> {
        let mut scenario = Scenario::named(INLINE_SCENARIO_NAME);
        scenario.description = text.trim().to_string();
        for entry in parse_shocks(text)? {
            scenario.apply(&entry)?;
        }
        Ok(scenario)
    }

    fn apply(&mut self, entry: &ShockEntry) -> Result<(), ParseError> {
        let err = |message: String| ParseError {
            message,
            position: entry.position,
        };
        let key = entry.key.as_str();
        if key == "price" || key == "market" {
            self.price_shock = as_fraction(entry).map_err(err)?;
        } else if key == "rates" || key == "rate" {
            self.rates_bp = match entry.unit {
                Unit::BasisPoints | Unit::Plain => entry.value,
                Unit::Percent => entry.value * 100.0,
            };
        } else if let Some(sector) = key.strip_prefix("sector.") {
            let sector = sector.trim();
            if sector.is_empty() {
                return Err(err("sector shock needs a sector name".into()));
            }
            self.sector_shocks
                .insert(sector.to_lowercase(), as_fraction(entry).map_err(err)?);
        } else if let Some(currency) = key.strip_prefix("fx.") {
            let currency = currency.trim();
            if currency.is_empty() {
                return Err(err("fx shock needs a currency".into()));
            }
            self.fx_shocks
                .insert(currency.to_uppercase(), as_fraction(entry).map_err(err)?);
        } else {
            return Err(err(format!(
                "unknown shock '{}' (expected price, rates, sector.<name> or fx.<currency>)",
                entry.key
            )));
        }
        Ok(())
    }

    pub fn sector_shock(&self, sector: Option<&str>) -> f64 {
        sector
            .and_then(|s| self.sector_shocks.get(&s.trim().to_lowercase()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn fx_shock(&self, currency: &str) -> f64 {
        self.fx_shocks
            .get(&currency.trim().to_uppercase())
            .copied()
            .unwrap_or(0.0)
    }

    /// Compact one-line summary, e.g. `price -20%, rates +100bp`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.price_shock != 0.0 {
            parts.push(format!("price {}", fmt_signed_pct(self.price_shock)));
        }
        if self.rates_bp != 0.0 {
            parts.push(format!("rates {:+}bp", self.rates_bp));
        }
        for (sector, shock) in &self.sector_shocks {
            parts.push(format!("sector.{} {}", sector, fmt_signed_pct(*shock)));
        }
        for (currency, shock) in &self.fx_shocks {
            parts.push(format!("fx.{} {}", currency, fmt_signed_pct(*shock)));
        }
        if parts.is_empty() {
            "no shocks".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn fmt_signed_pct(fraction: f64) -> String {
    format!("{:+}%", (fraction * 10_000.0).round() / 100.0)
}

fn as_fraction(entry: &ShockEntry) -> Result<f64, String> {
    let fraction = match entry.unit {
        Unit::Percent => entry.value / 100.0,
        Unit::BasisPoints => entry.value / 10_000.0,
        Unit::Plain => entry.value,
    };
    if fraction < -1.0 {
        return Err(format!("{} cannot fall by more than 100%", entry.key));
    }
    Ok(fraction)
}

/// Sector price sensitivity to rate moves, in percent per +100bp.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSensitivity {
    pub default: f64,
    pub sectors: BTreeMap<String, f64>,
}

impl Default for RateSensitivity {
    fn default() -> Self {
        Self {
            default: DEFAULT_RATE_SENSITIVITY,
            sectors: BTreeMap::new(),
        }
    }
}

impl RateSensitivity {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ValuescopeError> {
        let mut sensitivity = RateSensitivity::default();
        for key in config.keys(RATE_SENSITIVITY_SECTION) {
            let raw = config
                .get_string(RATE_SENSITIVITY_SECTION, &key)
                .unwrap_or_default();
            let value: f64 = raw.trim().parse().map_err(|_| ValuescopeError::ConfigInvalid {
                section: RATE_SENSITIVITY_SECTION.to_string(),
                key: key.clone(),
                reason: format!("expected a number, found '{}'", raw),
            })?;
            if key == "default" {
                sensitivity.default = value;
            } else {
                sensitivity.sectors.insert(key, value);
            }
        }
        Ok(sensitivity)
    }

    pub fn for_sector(&self, sector: Option<&str>) -> f64 {
        sector
            .and_then(|s| self.sectors.get(&s.trim().to_lowercase()))
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ValuescopeError> {
        let mut registry = ScenarioRegistry::default();
        for section in config.sections() {
            let Some(name) = section.strip_prefix(SCENARIO_SECTION_PREFIX) else {
                continue;
            };
            registry.insert(build_scenario(config, &section, name)?);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, scenario: Scenario) {
        self.scenarios.insert(scenario.name.clone(), scenario);
    }

    pub fn get(&self, name: &str) -> Result<&Scenario, ValuescopeError> {
        self.scenarios
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| ValuescopeError::UnknownScenario {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.scenarios.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }
}

fn build_scenario(
    config: &dyn ConfigPort,
    section: &str,
    name: &str,
) -> Result<Scenario, ValuescopeError> {
    let mut scenario = Scenario::named(name);
    for key in config.keys(section) {
        let value = config.get_string(section, &key).unwrap_or_default();
        if key == "description" {
            scenario.description = value;
            continue;
        }
        let invalid = |reason: String| ValuescopeError::ConfigInvalid {
            section: section.to_string(),
            key: key.clone(),
            reason,
        };
        let (amount, unit) =
            parse_amount(&value).map_err(|e| invalid(e.display_with_context(&value)))?;
        let entry = ShockEntry {
            key: key.clone(),
            value: amount,
            unit,
            position: 0,
        };
        scenario.apply(&entry).map_err(|e| invalid(e.message))?;
    }
    Ok(scenario)
}
