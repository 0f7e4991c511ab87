//! Configuration validation.
//!
//! Reads the `[screen]` and `[stress]` sections into typed settings,
//! rejecting out-of-range values before any data is fetched.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::batch::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_MS, FetchSettings};
use crate::domain::error::ValuescopeError;
use crate::domain::market::{Market, MarketFilter};
use crate::domain::ranker::DEFAULT_TOP_N;
use crate::domain::stress::{DEFAULT_CONCENTRATION_THRESHOLD, DEFAULT_WORST_K};
use crate::ports::config_port::ConfigPort;

pub const SCREEN_SECTION: &str = "screen";
pub const STRESS_SECTION: &str = "stress";

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub market: MarketFilter,
    pub preset: String,
    pub top: usize,
    pub reporting_currency: String,
    pub data_dir: PathBuf,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressConfig {
    pub portfolio: Option<PathBuf>,
    pub scenario: Option<String>,
    pub concentration_threshold: f64,
    pub worst_k: usize,
}

pub fn validate_screen_config(config: &dyn ConfigPort) -> Result<ScreenConfig, ValuescopeError> {
    let market = match config.get_string(SCREEN_SECTION, "market") {
        Some(m) => m
            .parse::<MarketFilter>()
            .map_err(|e| invalid(SCREEN_SECTION, "market", e.to_string()))?,
        None => MarketFilter::Only(Market::Japan),
    };

    let preset = config
        .get_string(SCREEN_SECTION, "preset")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "value".to_string());

    let top: usize = parsed(config, SCREEN_SECTION, "top")?.unwrap_or(DEFAULT_TOP_N);
    if top == 0 {
        return Err(invalid(SCREEN_SECTION, "top", "top must be at least 1".into()));
    }

    let reporting_currency = validate_currency(
        config
            .get_string(SCREEN_SECTION, "reporting_currency")
            .unwrap_or_else(|| "JPY".to_string()),
    )?;

    let data_dir = config
        .get_string(SCREEN_SECTION, "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    let concurrency: usize =
        parsed(config, SCREEN_SECTION, "concurrency")?.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err(invalid(
            SCREEN_SECTION,
            "concurrency",
            "concurrency must be at least 1".into(),
        ));
    }

    let timeout_ms: u64 =
        parsed(config, SCREEN_SECTION, "fetch_timeout_ms")?.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(invalid(
            SCREEN_SECTION,
            "fetch_timeout_ms",
            "fetch_timeout_ms must be positive".into(),
        ));
    }

    Ok(ScreenConfig {
        market,
        preset,
        top,
        reporting_currency,
        data_dir,
        fetch: FetchSettings {
            concurrency,
            timeout: Duration::from_millis(timeout_ms),
        },
    })
}

pub fn validate_stress_config(config: &dyn ConfigPort) -> Result<StressConfig, ValuescopeError> {
    let threshold: f64 = parsed(config, STRESS_SECTION, "concentration_threshold")?
        .unwrap_or(DEFAULT_CONCENTRATION_THRESHOLD);
    validate_threshold(threshold)?;

    let worst_k: usize = parsed(config, STRESS_SECTION, "worst_k")?.unwrap_or(DEFAULT_WORST_K);
    if worst_k == 0 {
        return Err(invalid(STRESS_SECTION, "worst_k", "worst_k must be at least 1".into()));
    }

    Ok(StressConfig {
        portfolio: non_empty(config.get_string(STRESS_SECTION, "portfolio")).map(PathBuf::from),
        scenario: non_empty(config.get_string(STRESS_SECTION, "scenario")),
        concentration_threshold: threshold,
        worst_k,
    })
}

pub fn validate_threshold(threshold: f64) -> Result<(), ValuescopeError> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(invalid(
            STRESS_SECTION,
            "concentration_threshold",
            "concentration_threshold must be in (0, 1]".into(),
        ));
    }
    Ok(())
}

pub fn validate_currency(code: String) -> Result<String, ValuescopeError> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(
            SCREEN_SECTION,
            "reporting_currency",
            format!("'{}' is not a three-letter currency code", code),
        ));
    }
    Ok(code)
}

fn parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, ValuescopeError> {
    match non_empty(config.get_string(section, key)) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, reason: String) -> ValuescopeError {
    ValuescopeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
