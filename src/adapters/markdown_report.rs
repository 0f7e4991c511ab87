//! Markdown report adapter implementing ReportPort.
//!
//! Undefined values render as `-`; percentages carry two decimals.

use crate::domain::batch::BatchReport;
use crate::domain::fundamentals::MetricValue;
use crate::domain::preset::Preset;
use crate::domain::scenario::Scenario;
use crate::domain::scorer::{ScoredSecurity, score_label};
use crate::domain::stress::ScenarioResult;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct MarkdownReportAdapter;

impl MarkdownReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for MarkdownReportAdapter {
    fn render_screen(
        &self,
        title: &str,
        preset: &Preset,
        ranked: &[ScoredSecurity],
        disqualified: &[ScoredSecurity],
        batch: &BatchReport,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("## Screening: {}\n\n", title));
        output.push_str(&format!("Preset: **{}**", preset.name));
        if !preset.description.is_empty() {
            output.push_str(&format!(" ({})", preset.description));
        }
        output.push('\n');
        if !preset.thresholds.is_empty() {
            output.push_str(&format!("Criteria: {}\n", preset.criteria_text()));
        }
        output.push('\n');

        if ranked.is_empty() {
            output.push_str(&format!(
                "No securities passed the {} preset.\n\n",
                preset.name
            ));
        } else {
            output.push_str("| Rank | Symbol | Price | P/E | P/B | Yield | ROE | Score | Verdict |\n");
            output.push_str("|---:|:---|---:|---:|---:|---:|---:|---:|:---|\n");
            for (i, s) in ranked.iter().enumerate() {
                let m = &s.metric;
                let score = s.score();
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                    i + 1,
                    s.symbol(),
                    format_value(m.price),
                    format_value(m.pe_ratio),
                    format_value(m.pb_ratio),
                    format_pct_value(m.dividend_yield),
                    format_pct_value(m.roe),
                    score.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into()),
                    score.map(score_label).unwrap_or("-"),
                ));
            }
            output.push('\n');
        }

        if !disqualified.is_empty() {
            output.push_str("### Disqualified\n\n");
            output.push_str("| Symbol | Reason |\n");
            output.push_str("|:---|:---|\n");
            for s in disqualified {
                output.push_str(&format!(
                    "| {} | {} |\n",
                    s.symbol(),
                    s.reason().unwrap_or("-")
                ));
            }
            output.push('\n');
        }

        output.push_str(&format_run_summary(batch));
        output
    }

    fn render_stress(&self, scenario: &Scenario, result: &ScenarioResult, batch: &BatchReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("## Stress test: {}\n\n", scenario.name));
        if !scenario.description.is_empty() {
            output.push_str(&format!("{}\n", scenario.description));
        }
        output.push_str(&format!("Shocks: {}\n", scenario.summary()));
        output.push_str(&format!(
            "Reporting currency: {}\n\n",
            result.reporting_currency
        ));

        if result.holding_count() == 0 {
            output.push_str("No holdings to stress.\n\n");
            output.push_str(&format_run_summary(batch));
            return output;
        }

        if !result.holdings.is_empty() {
            output.push_str(
                "| Symbol | Sector | Value | Shocked price | Shocked value | Delta | Impact | Weight | Yield after | P&L after | Flag |\n",
            );
            output.push_str("|:---|:---|---:|---:|---:|---:|---:|---:|---:|---:|:---|\n");
            for h in &result.holdings {
                let sector = if h.is_cash {
                    "cash"
                } else {
                    h.sector.as_deref().unwrap_or("-")
                };
                output.push_str(&format!(
                    "| {} | {} | {:.2} | {:.2} | {:.2} | {:+.2} | {} | {} | {} | {} | {} |\n",
                    h.symbol,
                    sector,
                    h.prior_value,
                    h.shocked_price,
                    h.shocked_value,
                    h.value_delta,
                    format_signed_pct(h.portfolio_impact * 100.0),
                    format_pct(h.shocked_weight * 100.0),
                    if h.is_cash {
                        "-".to_string()
                    } else {
                        format_pct_value(h.shocked_dividend_yield)
                    },
                    h.unrealized_pnl_after
                        .map(|p| format!("{:+.2}", p))
                        .unwrap_or_else(|| "-".into()),
                    if h.concentrated { "concentrated" } else { "" },
                ));
            }
            output.push('\n');
        }

        output.push_str(&format!(
            "**Portfolio**: {:.2} -> {:.2}, delta {:+.2} ({})\n\n",
            result.total_value_before,
            result.total_value_after,
            result.aggregate_delta,
            format_signed_pct(result.percent_impact * 100.0)
        ));

        if !result.worst_contributors.is_empty() {
            output.push_str("### Worst contributors\n\n");
            for (i, h) in result.worst_contributors.iter().enumerate() {
                output.push_str(&format!(
                    "{}. {}: {:+.2} ({})\n",
                    i + 1,
                    h.symbol,
                    h.value_delta,
                    format_signed_pct(h.portfolio_impact * 100.0)
                ));
            }
            output.push('\n');
        }

        output.push_str("### Concentration\n\n");
        let flagged: Vec<_> = result.concentrated().collect();
        if flagged.is_empty() {
            output.push_str(&format!(
                "No holding exceeds {} of post-shock value.\n\n",
                format_pct(result.concentration_threshold * 100.0)
            ));
        } else {
            for h in flagged {
                output.push_str(&format!(
                    "- {}: {} of post-shock value (threshold {})\n",
                    h.symbol,
                    format_pct(h.shocked_weight * 100.0),
                    format_pct(result.concentration_threshold * 100.0)
                ));
            }
            output.push('\n');
        }

        if !result.unshockable.is_empty() {
            output.push_str("### Unshockable holdings\n\n");
            for u in &result.unshockable {
                output.push_str(&format!("- {}: {}\n", u.symbol, u.reason));
            }
            output.push('\n');
        }

        output.push_str(&format_run_summary(batch));
        output
    }
}

fn format_run_summary(batch: &BatchReport) -> String {
    let mut output = String::from("### Run summary\n\n");
    output.push_str(&format!("- Requested: {}\n", batch.requested));
    output.push_str(&format!("- Succeeded: {}\n", batch.succeeded));
    output.push_str(&format!("- Degraded: {}\n", batch.degraded.len()));
    for d in &batch.degraded {
        output.push_str(&format!("  - {}: {}\n", d.symbol, d.reason));
    }
    if batch.incomplete > 0 {
        output.push_str(&format!("- Incomplete metrics: {}\n", batch.incomplete));
    }
    if !batch.missing_fx.is_empty() {
        output.push_str(&format!("- No fx rate: {}\n", batch.missing_fx.join(", ")));
    }
    output
}

fn format_value(value: MetricValue) -> String {
    match value {
        MetricValue::Defined(v) => format!("{:.2}", v),
        MetricValue::Undefined(_) => "-".to_string(),
    }
}

fn format_pct_value(value: MetricValue) -> String {
    match value {
        MetricValue::Defined(v) => format_pct(v),
        MetricValue::Undefined(_) => "-".to_string(),
    }
}

fn format_pct(value: f64) -> String {
    format!("{:.2}%", value)
}

fn format_signed_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{DegradeReason, DegradedSymbol};
    use crate::domain::fundamentals::{CanonicalMetric, Completeness, UndefinedReason};
    use crate::domain::holding::Holding;
    use crate::domain::normalizer::FxTable;
    use crate::domain::preset::Scoring;
    use crate::domain::scorer::Verdict;
    use crate::domain::stress::{StressSettings, apply_scenario};
    use std::collections::HashMap;

    fn metric(symbol: &str, price: f64) -> CanonicalMetric {
        CanonicalMetric {
            symbol: symbol.into(),
            as_of: None,
            currency: "USD".into(),
            price: MetricValue::Defined(price),
            pe_ratio: MetricValue::Defined(6.0),
            pb_ratio: MetricValue::Undefined(UndefinedReason::NonPositiveDenominator),
            dividend_yield: MetricValue::Defined(3.456),
            roe: MetricValue::Defined(12.0),
            market_value: MetricValue::Undefined(UndefinedReason::Missing),
            fx_rate: MetricValue::Defined(1.0),
            dividend_per_share: Some(price * 0.03),
            sector: Some("Energy".into()),
            completeness: Completeness::default(),
        }
    }

    fn preset() -> Preset {
        Preset {
            name: "value".into(),
            description: "Cheap stocks".into(),
            thresholds: Vec::new(),
            weights: Vec::new(),
            scoring: Scoring::Absolute,
        }
    }

    fn batch() -> BatchReport {
        BatchReport {
            requested: 3,
            succeeded: 2,
            degraded: vec![DegradedSymbol {
                symbol: "BAD".into(),
                reason: DegradeReason::FetchFailed("not found".into()),
            }],
            incomplete: 1,
            missing_fx: Vec::new(),
        }
    }

    #[test]
    fn screen_table_shows_dash_for_undefined() {
        let ranked = vec![ScoredSecurity {
            metric: metric("XOM", 100.0),
            preset: "value".into(),
            verdict: Verdict::Pass { score: 72.5 },
        }];
        let out = MarkdownReportAdapter::new().render_screen("us", &preset(), &ranked, &[], &batch());
        assert!(out.contains("| 1 | XOM | 100.00 | 6.00 | - | 3.46% | 12.00% | 72.50 | strong value |"));
        assert!(out.contains("Preset: **value** (Cheap stocks)"));
    }

    #[test]
    fn empty_screen_says_nothing_passed() {
        let out = MarkdownReportAdapter::new().render_screen("us", &preset(), &[], &[], &batch());
        assert!(out.contains("No securities passed the value preset."));
        assert!(!out.contains("| Rank |"));
    }

    #[test]
    fn disqualified_rows_show_reason() {
        let failed = vec![ScoredSecurity {
            metric: metric("KO", 60.0),
            preset: "value".into(),
            verdict: Verdict::Fail {
                reason: "P/E exceeds threshold".into(),
            },
        }];
        let out = MarkdownReportAdapter::new().render_screen("us", &preset(), &[], &failed, &batch());
        assert!(out.contains("No securities passed the value preset."));
        assert!(out.contains("### Disqualified"));
        assert!(out.contains("| KO | P/E exceeds threshold |"));
    }

    #[test]
    fn run_summary_lists_degraded_symbols() {
        let out = MarkdownReportAdapter::new().render_screen("us", &preset(), &[], &[], &batch());
        assert!(out.contains("- Requested: 3"));
        assert!(out.contains("- Succeeded: 2"));
        assert!(out.contains("- Degraded: 1"));
        assert!(out.contains("  - BAD: fetch failed: not found"));
        assert!(out.contains("- Incomplete metrics: 1"));
    }

    #[test]
    fn stress_report_lists_flags_and_unshockable() {
        let holdings = vec![
            Holding::new("XOM", 90.0, 80.0, "USD"),
            Holding::new("CVX", 10.0, 80.0, "USD"),
            Holding::new("GONE", 1.0, 1.0, "USD"),
        ];
        let metrics: HashMap<_, _> = [metric("XOM", 100.0), metric("CVX", 100.0)]
            .into_iter()
            .map(|m| (m.symbol.clone(), m))
            .collect();
        let scenario = Scenario::parse_inline("price=-20%").unwrap();
        let result = apply_scenario(
            &holdings,
            &metrics,
            &scenario,
            &FxTable::new("USD"),
            &StressSettings::default(),
        );
        let out = MarkdownReportAdapter::new().render_stress(&scenario, &result, &batch());
        assert!(out.contains("## Stress test: custom"));
        assert!(out.contains("Shocks: price -20%"));
        assert!(out.contains("- XOM: 90.00% of post-shock value (threshold 25.00%)"));
        assert!(out.contains("### Unshockable holdings"));
        assert!(out.contains("- GONE: no metric available"));
        assert!(out.contains("(-20.00%)"));
        assert!(out.contains("1. XOM: -1800.00"));
    }

    #[test]
    fn empty_portfolio_report() {
        let scenario = Scenario::parse_inline("price=-20%").unwrap();
        let result = apply_scenario(
            &[],
            &HashMap::new(),
            &scenario,
            &FxTable::new("JPY"),
            &StressSettings::default(),
        );
        let out = MarkdownReportAdapter::new().render_stress(&scenario, &result, &BatchReport::default());
        assert!(out.contains("No holdings to stress."));
        assert!(out.contains("### Run summary"));
    }
}
