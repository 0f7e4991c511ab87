//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::adapters::portfolio_csv_adapter::PortfolioCsvAdapter;
use crate::domain::batch::{fetch_batch, fetch_batch_with_currencies};
use crate::domain::config_validation::{
    SCREEN_SECTION, STRESS_SECTION, validate_currency, validate_screen_config,
    validate_stress_config, validate_threshold,
};
use crate::domain::error::ValuescopeError;
use crate::domain::market::MarketFilter;
use crate::domain::preset::{Direction, PresetRegistry, WeightedMetric};
use crate::domain::ranker::rank;
use crate::domain::scenario::{RateSensitivity, Scenario, ScenarioRegistry};
use crate::domain::scorer::{ScoredSecurity, score_all};
use crate::domain::stress::{StressSettings, apply_scenario};
use crate::domain::universe::{default_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "valuescope", about = "Value screening and portfolio stress testing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen a market universe against a preset
    Screen {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        args: ScreenArgs,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a shock scenario to a portfolio
    Stress {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        args: StressArgs,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available presets
    Presets {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List available scenarios
    Scenarios {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScreenArgs {
    /// japan, us, asean or all
    #[arg(long)]
    pub market: Option<String>,
    #[arg(long)]
    pub preset: Option<String>,
    #[arg(long)]
    pub top: Option<usize>,
    /// Comma-separated symbols; defaults to the market universe
    #[arg(long)]
    pub symbols: Option<String>,
    /// Reporting currency
    #[arg(long)]
    pub currency: Option<String>,
    /// Also list disqualified securities with their reasons
    #[arg(long)]
    pub show_failed: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StressArgs {
    #[arg(long)]
    pub portfolio: Option<PathBuf>,
    #[arg(long, conflicts_with = "shock")]
    pub scenario: Option<String>,
    /// Inline shocks, e.g. "price=-20%, rates=+100bp"
    #[arg(long)]
    pub shock: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    /// Post-shock weight that flags a holding as concentrated
    #[arg(long)]
    pub threshold: Option<f64>,
    #[arg(long)]
    pub worst: Option<usize>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Screen {
            config,
            args,
            data_dir,
            output,
        } => run_screen(config.as_deref(), &args, data_dir, output.as_deref()),
        Command::Stress {
            config,
            args,
            data_dir,
            output,
        } => run_stress(config.as_deref(), &args, data_dir, output.as_deref()),
        Command::Presets { config } => run_presets(config.as_deref()),
        Command::Scenarios { config } => run_scenarios(config.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Built-in defaults, with the user file layered over them when given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ValuescopeError> {
    match path {
        Some(p) => {
            tracing::info!(file = %p.display(), "loading config");
            FileConfigAdapter::layered(p)
        }
        None => FileConfigAdapter::defaults(),
    }
}

fn run_screen(
    config_path: Option<&Path>,
    args: &ScreenArgs,
    data_dir: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<(), ValuescopeError> {
    let config = load_config(config_path)?;
    let data_dir = match data_dir {
        Some(d) => d,
        None => validate_screen_config(&config)?.data_dir,
    };
    let provider: Arc<dyn MarketDataPort> = Arc::new(CsvAdapter::new(data_dir)?);
    let report = screen_report(&config, &provider, args)?;
    emit(&report, output)
}

fn run_stress(
    config_path: Option<&Path>,
    args: &StressArgs,
    data_dir: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<(), ValuescopeError> {
    let config = load_config(config_path)?;
    let stress = validate_stress_config(&config)?;
    let portfolio_path = args
        .portfolio
        .clone()
        .or(stress.portfolio)
        .ok_or_else(|| ValuescopeError::ConfigMissing {
            section: STRESS_SECTION.to_string(),
            key: "portfolio".to_string(),
        })?;
    let data_dir = match data_dir {
        Some(d) => d,
        None => validate_screen_config(&config)?.data_dir,
    };
    let portfolio = PortfolioCsvAdapter::new(portfolio_path);
    let provider: Arc<dyn MarketDataPort> = Arc::new(CsvAdapter::new(data_dir)?);
    let report = stress_report(&config, &provider, &portfolio, args)?;
    emit(&report, output)
}

fn emit(report: &str, output: Option<&Path>) -> Result<(), ValuescopeError> {
    match output {
        Some(path) => {
            fs::write(path, report)?;
            tracing::info!(file = %path.display(), "report written");
        }
        None => print!("{}", report),
    }
    Ok(())
}

/// Screening path: universe -> fetch -> normalize -> score -> rank -> render.
/// Preset and market are resolved before anything is fetched.
pub fn screen_report(
    config: &dyn ConfigPort,
    provider: &Arc<dyn MarketDataPort>,
    args: &ScreenArgs,
) -> Result<String, ValuescopeError> {
    let settings = validate_screen_config(config)?;

    let market = match &args.market {
        Some(m) => m
            .parse::<MarketFilter>()
            .map_err(|e| ValuescopeError::ConfigInvalid {
                section: SCREEN_SECTION.to_string(),
                key: "market".to_string(),
                reason: e.to_string(),
            })?,
        None => settings.market,
    };

    let presets = PresetRegistry::from_config(config)?;
    let preset = presets.get(args.preset.as_deref().unwrap_or(&settings.preset))?;

    let top = args.top.unwrap_or(settings.top);
    let currency = match &args.currency {
        Some(c) => validate_currency(c.clone())?,
        None => settings.reporting_currency.clone(),
    };

    let symbols = match &args.symbols {
        Some(list) => parse_symbols(list, market).map_err(|e| ValuescopeError::ConfigInvalid {
            section: SCREEN_SECTION.to_string(),
            key: "symbols".to_string(),
            reason: e.to_string(),
        })?,
        None => default_universe(config, market)?,
    };

    tracing::info!(
        market = %market,
        preset = %preset.name,
        symbols = symbols.len(),
        top,
        "screening"
    );

    let batch = fetch_batch(provider, &symbols, &currency, &settings.fetch)?;
    let scored = score_all(&batch.metrics, preset);
    let ranked = rank(&scored, market, Some(top));
    let mut disqualified: Vec<ScoredSecurity> = if args.show_failed {
        scored
            .iter()
            .filter(|s| !s.passed() && market.includes_symbol(s.symbol()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    disqualified.sort_by(|a, b| a.symbol().cmp(b.symbol()));
    tracing::info!(
        passed = scored.iter().filter(|s| s.passed()).count(),
        shown = ranked.len(),
        "screen complete"
    );

    let title = format!("{} market, top {}", market, top);
    Ok(MarkdownReportAdapter::new().render_screen(
        &title,
        preset,
        &ranked,
        &disqualified,
        &batch.report,
    ))
}

/// Stress path: scenario -> holdings -> fetch -> normalize -> shock -> render.
/// The scenario is resolved before holdings are loaded, so an unknown name
/// performs no work.
pub fn stress_report(
    config: &dyn ConfigPort,
    provider: &Arc<dyn MarketDataPort>,
    portfolio: &dyn PortfolioPort,
    args: &StressArgs,
) -> Result<String, ValuescopeError> {
    let screen = validate_screen_config(config)?;
    let stress = validate_stress_config(config)?;

    let scenario = match (&args.shock, &args.scenario) {
        (Some(text), _) => Scenario::parse_inline(text)?,
        (None, name) => {
            let name = name
                .clone()
                .or(stress.scenario.clone())
                .ok_or_else(|| ValuescopeError::ConfigMissing {
                    section: STRESS_SECTION.to_string(),
                    key: "scenario".to_string(),
                })?;
            ScenarioRegistry::from_config(config)?.get(&name)?.clone()
        }
    };

    let threshold = args.threshold.unwrap_or(stress.concentration_threshold);
    validate_threshold(threshold)?;
    let worst_k = args.worst.unwrap_or(stress.worst_k);
    if worst_k == 0 {
        return Err(ValuescopeError::ConfigInvalid {
            section: STRESS_SECTION.to_string(),
            key: "worst_k".to_string(),
            reason: "worst_k must be at least 1".to_string(),
        });
    }
    let settings = StressSettings {
        concentration_threshold: threshold,
        worst_k,
        rate_sensitivity: RateSensitivity::from_config(config)?,
    };
    let currency = match &args.currency {
        Some(c) => validate_currency(c.clone())?,
        None => screen.reporting_currency.clone(),
    };

    let holdings = portfolio.load_holdings()?;
    let symbols: Vec<String> = holdings
        .iter()
        .filter(|h| !h.is_cash())
        .map(|h| h.symbol.clone())
        .collect();
    let currencies: Vec<String> = holdings
        .iter()
        .map(|h| h.cash_currency().unwrap_or_else(|| h.currency.clone()))
        .collect();

    tracing::info!(
        scenario = %scenario.name,
        holdings = holdings.len(),
        "stress testing"
    );

    let batch =
        fetch_batch_with_currencies(provider, &symbols, &currencies, &currency, &screen.fetch)?;
    let metrics: HashMap<String, _> = batch
        .metrics
        .iter()
        .map(|m| (m.symbol.clone(), m.clone()))
        .collect();

    let result = apply_scenario(&holdings, &metrics, &scenario, &batch.fx, &settings);
    if result.holdings.is_empty() && batch.report.all_failed() {
        return Err(ValuescopeError::AllSymbolsFailed {
            requested: batch.report.requested,
        });
    }
    tracing::info!(
        delta = result.aggregate_delta,
        unshockable = result.unshockable.len(),
        "stress complete"
    );

    Ok(MarkdownReportAdapter::new().render_stress(&scenario, &result, &batch.report))
}

fn run_presets(config_path: Option<&Path>) -> Result<(), ValuescopeError> {
    let config = load_config(config_path)?;
    print!("{}", presets_table(&PresetRegistry::from_config(&config)?));
    Ok(())
}

fn run_scenarios(config_path: Option<&Path>) -> Result<(), ValuescopeError> {
    let config = load_config(config_path)?;
    print!("{}", scenarios_table(&ScenarioRegistry::from_config(&config)?));
    Ok(())
}

pub fn presets_table(registry: &PresetRegistry) -> String {
    let mut output = String::from("| Preset | Description | Criteria | Weights |\n");
    output.push_str("|:---|:---|:---|:---|\n");
    for preset in registry.iter() {
        let weights: Vec<String> = preset.weights.iter().map(format_weight).collect();
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            preset.name,
            preset.description,
            preset.criteria_text(),
            weights.join(", ")
        ));
    }
    output
}

pub fn scenarios_table(registry: &ScenarioRegistry) -> String {
    let mut output = String::from("| Scenario | Description | Shocks |\n");
    output.push_str("|:---|:---|:---|\n");
    for scenario in registry.iter() {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            scenario.name,
            scenario.description,
            scenario.summary()
        ));
    }
    output
}

fn format_weight(w: &WeightedMetric) -> String {
    let direction = match w.direction {
        Direction::LowerIsBetter => "lower",
        Direction::HigherIsBetter => "higher",
    };
    format!("{}:{}:{}", w.metric.key(), direction, w.weight)
}

fn run_validate(config_path: &Path) -> Result<(), ValuescopeError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(Some(config_path))?;
    let summary = validate_all(&config)?;
    println!("{}", summary);
    Ok(())
}

/// Load every registry and section so any invalid definition surfaces.
pub fn validate_all(config: &dyn ConfigPort) -> Result<String, ValuescopeError> {
    validate_screen_config(config)?;
    validate_stress_config(config)?;
    let presets = PresetRegistry::from_config(config)?;
    let scenarios = ScenarioRegistry::from_config(config)?;
    RateSensitivity::from_config(config)?;
    let universe = default_universe(config, MarketFilter::All)?;
    Ok(format!(
        "config OK: {} presets, {} scenarios, {} universe symbols",
        presets.len(),
        scenarios.names().len(),
        universe.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_screen_flags() {
        let cli = Cli::try_parse_from([
            "valuescope",
            "screen",
            "--market",
            "all",
            "--preset",
            "deep-value",
            "--top",
            "5",
        ])
        .unwrap();
        match cli.command {
            Command::Screen { args, .. } => {
                assert_eq!(args.market.as_deref(), Some("all"));
                assert_eq!(args.preset.as_deref(), Some("deep-value"));
                assert_eq!(args.top, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn scenario_and_shock_conflict() {
        let result = Cli::try_parse_from([
            "valuescope",
            "stress",
            "--scenario",
            "market-crash",
            "--shock",
            "price=-10%",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn built_in_config_validates() {
        let config = FileConfigAdapter::defaults().unwrap();
        let summary = validate_all(&config).unwrap();
        assert!(summary.starts_with("config OK: 5 presets"));
    }

    #[test]
    fn presets_table_lists_every_preset() {
        let config = FileConfigAdapter::defaults().unwrap();
        let table = presets_table(&PresetRegistry::from_config(&config).unwrap());
        for name in ["value", "high-dividend", "growth-value", "deep-value", "quality"] {
            assert!(table.contains(&format!("| {} |", name)), "missing {}", name);
        }
        assert!(table.contains("pe:lower:0.5, pb:lower:0.5"));
    }

    #[test]
    fn scenarios_table_shows_shock_summary() {
        let config = FileConfigAdapter::defaults().unwrap();
        let table = scenarios_table(&ScenarioRegistry::from_config(&config).unwrap());
        assert!(table.contains("| market-crash | Broad equity sell-off | price -20% |"));
    }
}
