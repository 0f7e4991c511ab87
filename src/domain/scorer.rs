//! Scorer: applies a preset to a canonical metric record.
//!
//! Sub-scores use a saturating transform around a reference value:
//! `r / (r + x)` when lower is better, `x / (x + r)` when higher is better.
//! Both are monotonic and bounded to [0, 1], so a near-zero P/E from a
//! one-off gain can contribute at most its weight. The composite is the
//! weighted mean scaled to 0..100.
//!
//! Presets with relative scoring replace each sub-score with the
//! candidate's mid-rank percentile among the securities that passed every
//! threshold, so the composite ranks peers against each other.

use crate::domain::fundamentals::{CanonicalMetric, MetricValue};
use crate::domain::preset::{Direction, Preset, Scoring, WeightedMetric};

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass { score: f64 },
    Fail { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSecurity {
    pub metric: CanonicalMetric,
    pub preset: String,
    pub verdict: Verdict,
}

impl ScoredSecurity {
    pub fn symbol(&self) -> &str {
        &self.metric.symbol
    }

    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self.verdict {
            Verdict::Pass { score } => Some(score),
            Verdict::Fail { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Pass { .. } => None,
            Verdict::Fail { reason } => Some(reason),
        }
    }
}

pub fn score(metric: &CanonicalMetric, preset: &Preset) -> ScoredSecurity {
    let verdict = match disqualification(metric, preset) {
        Some(reason) => Verdict::Fail { reason },
        None => Verdict::Pass {
            score: composite(metric, preset),
        },
    };
    ScoredSecurity {
        metric: metric.clone(),
        preset: preset.name.clone(),
        verdict,
    }
}

pub fn score_all(metrics: &[CanonicalMetric], preset: &Preset) -> Vec<ScoredSecurity> {
    let mut scored: Vec<ScoredSecurity> = metrics.iter().map(|m| score(m, preset)).collect();
    if preset.scoring == Scoring::Relative {
        rescore_relative(&mut scored, preset);
    }
    scored
}

/// Replaces absolute composites of passing securities with percentile
/// composites computed over the passing cohort.
fn rescore_relative(scored: &mut [ScoredSecurity], preset: &Preset) {
    let total_weight = preset.total_weight();
    let cohort: Vec<&CanonicalMetric> = scored
        .iter()
        .filter(|s| s.passed())
        .map(|s| &s.metric)
        .collect();

    let composites: Vec<Option<f64>> = scored
        .iter()
        .map(|s| {
            if !s.passed() {
                return None;
            }
            if total_weight <= 0.0 {
                return Some(0.0);
            }
            let weighted: f64 = preset
                .weights
                .iter()
                .map(|w| {
                    let peers: Vec<f64> = cohort
                        .iter()
                        .filter_map(|m| m.get(w.metric).value())
                        .collect();
                    w.weight * percentile(s.metric.get(w.metric), &peers, w.direction)
                })
                .sum();
            Some(100.0 * weighted / total_weight)
        })
        .collect();

    for (security, composite) in scored.iter_mut().zip(composites) {
        if let Some(score) = composite {
            security.verdict = Verdict::Pass { score };
        }
    }
}

/// Mid-rank percentile of `value` among `peers`, oriented so that 1.0 is
/// best. Ties count half. A lone peer scores 1.0; undefined scores 0.
pub fn percentile(value: MetricValue, peers: &[f64], direction: Direction) -> f64 {
    let MetricValue::Defined(x) = value else {
        return 0.0;
    };
    let others = peers.len().saturating_sub(1);
    if others == 0 {
        return 1.0;
    }
    let (worse, ties) = peers.iter().fold((0usize, 0usize), |(worse, ties), &p| {
        let beats = match direction {
            Direction::LowerIsBetter => x < p,
            Direction::HigherIsBetter => x > p,
        };
        if beats {
            (worse + 1, ties)
        } else if p == x {
            (worse, ties + 1)
        } else {
            (worse, ties)
        }
    });
    // `ties` includes the value itself.
    (worse as f64 + 0.5 * ties.saturating_sub(1) as f64) / others as f64
}

/// First violated threshold, in preset order.
fn disqualification(metric: &CanonicalMetric, preset: &Preset) -> Option<String> {
    preset
        .thresholds
        .iter()
        .find_map(|threshold| match metric.get(threshold.metric) {
            MetricValue::Undefined(reason) => {
                Some(format!("{} undefined ({})", threshold.metric.label(), reason))
            }
            MetricValue::Defined(v) if !threshold.is_satisfied_by(v) => Some(threshold.violation()),
            MetricValue::Defined(_) => None,
        })
}

fn composite(metric: &CanonicalMetric, preset: &Preset) -> f64 {
    let total_weight = preset.total_weight();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = preset
        .weights
        .iter()
        .map(|w| w.weight * sub_score(metric.get(w.metric), w))
        .sum();
    100.0 * weighted / total_weight
}

/// Undefined metrics contribute nothing.
pub fn sub_score(value: MetricValue, weighted: &WeightedMetric) -> f64 {
    let MetricValue::Defined(x) = value else {
        return 0.0;
    };
    let r = weighted.reference();
    match weighted.direction {
        Direction::LowerIsBetter if x <= 0.0 => 1.0,
        Direction::LowerIsBetter => r / (r + x),
        Direction::HigherIsBetter if x <= 0.0 => 0.0,
        Direction::HigherIsBetter => x / (x + r),
    }
}

pub fn score_label(score: f64) -> &'static str {
    if score >= 70.0 {
        "strong value"
    } else if score >= 50.0 {
        "moderate value"
    } else if score >= 30.0 {
        "fair"
    } else {
        "expensive"
    }
}
