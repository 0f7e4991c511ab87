//! Screening presets: declarative scoring and disqualification policies.
//!
//! Presets are configuration data. The registry is built from every
//! `[preset.<name>]` section and validated up front, so adding a preset
//! never touches the scorer.

use std::collections::BTreeMap;

use crate::domain::criteria_parser::{parse_criteria, parse_weights};
use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::MetricKind;
use crate::ports::config_port::ConfigPort;

pub const PRESET_SECTION_PREFIX: &str = "preset.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    AtMost,
    GreaterThan,
    AtLeast,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::AtMost => "<=",
            Comparison::GreaterThan => ">",
            Comparison::AtLeast => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: MetricKind,
    pub comparison: Comparison,
    pub value: f64,
}

impl Threshold {
    pub fn is_satisfied_by(&self, v: f64) -> bool {
        match self.comparison {
            Comparison::LessThan => v < self.value,
            Comparison::AtMost => v <= self.value,
            Comparison::GreaterThan => v > self.value,
            Comparison::AtLeast => v >= self.value,
        }
    }

    /// Reason recorded against a security that fails this threshold.
    pub fn violation(&self) -> String {
        match self.comparison {
            Comparison::LessThan | Comparison::AtMost => {
                format!("{} exceeds threshold", self.metric.label())
            }
            Comparison::GreaterThan | Comparison::AtLeast => {
                format!("{} below threshold", self.metric.label())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMetric {
    pub metric: MetricKind,
    pub direction: Direction,
    pub weight: f64,
    /// Metric value at which the sub-score is 0.5. Falls back to a
    /// per-metric default.
    pub reference: Option<f64>,
}

impl WeightedMetric {
    pub fn reference(&self) -> f64 {
        self.reference
            .unwrap_or_else(|| default_reference(self.metric))
    }
}

pub fn default_reference(metric: MetricKind) -> f64 {
    match metric {
        MetricKind::PeRatio => 15.0,
        MetricKind::PbRatio => 1.5,
        MetricKind::DividendYield => 3.0,
        MetricKind::Roe => 10.0,
        MetricKind::MarketValue => 100_000_000_000.0,
    }
}

/// How sub-scores are derived from metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scoring {
    /// Saturating transform around each metric's reference value.
    #[default]
    Absolute,
    /// Percentile rank among the candidates that passed every threshold.
    Relative,
}

impl Scoring {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "absolute" => Some(Scoring::Absolute),
            "relative" | "percentile" => Some(Scoring::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub thresholds: Vec<Threshold>,
    pub weights: Vec<WeightedMetric>,
    pub scoring: Scoring,
}

impl Preset {
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }

    pub fn criteria_text(&self) -> String {
        self.thresholds
            .iter()
            .map(|t| format!("{} {} {}", t.metric.key(), t.comparison.symbol(), t.value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: BTreeMap<String, Preset>,
}

impl PresetRegistry {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ValuescopeError> {
        let mut registry = PresetRegistry::default();
        for section in config.sections() {
            let Some(name) = section.strip_prefix(PRESET_SECTION_PREFIX) else {
                continue;
            };
            let preset = build_preset(config, &section, name)?;
            registry.insert(preset);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, preset: Preset) {
        self.presets.insert(preset.name.clone(), preset);
    }

    pub fn get(&self, name: &str) -> Result<&Preset, ValuescopeError> {
        self.presets
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| ValuescopeError::UnknownPreset {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn build_preset(
    config: &dyn ConfigPort,
    section: &str,
    name: &str,
) -> Result<Preset, ValuescopeError> {
    let invalid = |key: &str, reason: String| ValuescopeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    };

    let criteria = config.get_string(section, "criteria").unwrap_or_default();
    let thresholds = parse_criteria(&criteria)
        .map_err(|e| invalid("criteria", e.display_with_context(&criteria)))?;

    let weights_str = config
        .get_string(section, "weights")
        .ok_or_else(|| ValuescopeError::ConfigMissing {
            section: section.to_string(),
            key: "weights".to_string(),
        })?;
    let weights = parse_weights(&weights_str)
        .map_err(|e| invalid("weights", e.display_with_context(&weights_str)))?;

    let mut seen = Vec::new();
    for w in &weights {
        if seen.contains(&w.metric) {
            return Err(invalid(
                "weights",
                format!("{} weighted more than once", w.metric.key()),
            ));
        }
        seen.push(w.metric);
    }

    let scoring = match config.get_string(section, "scoring") {
        Some(raw) => Scoring::parse(&raw).ok_or_else(|| {
            invalid(
                "scoring",
                format!("'{}' is not absolute or relative", raw.trim()),
            )
        })?,
        None => Scoring::Absolute,
    };

    Ok(Preset {
        name: name.trim().to_lowercase(),
        description: config.get_string(section, "description").unwrap_or_default(),
        thresholds,
        weights,
        scoring,
    })
}
