//! Symbol universes: explicit symbol lists and per-market defaults.

use std::collections::HashSet;

use crate::domain::error::ValuescopeError;
use crate::domain::market::{Market, MarketFilter};
use crate::ports::config_port::ConfigPort;

pub const MARKET_SECTION_PREFIX: &str = "market.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Split a comma-separated symbol list. When the filter names a single
/// market, bare codes are turned into that market's tickers.
pub fn parse_symbols(input: &str, filter: MarketFilter) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = match filter {
            MarketFilter::Only(market) => market.format_ticker(trimmed),
            MarketFilter::All => trimmed.to_uppercase(),
        };
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Default universe for the filtered markets, read from each
/// `[market.<name>] symbols` entry.
pub fn default_universe(
    config: &dyn ConfigPort,
    filter: MarketFilter,
) -> Result<Vec<String>, ValuescopeError> {
    let mut symbols = Vec::new();
    for market in filter.markets() {
        symbols.extend(market_symbols(config, market)?);
    }
    Ok(symbols)
}

fn market_symbols(config: &dyn ConfigPort, market: Market) -> Result<Vec<String>, ValuescopeError> {
    let section = format!("{}{}", MARKET_SECTION_PREFIX, market.name());
    let list = config
        .get_string(&section, "symbols")
        .ok_or_else(|| ValuescopeError::ConfigMissing {
            section: section.clone(),
            key: "symbols".to_string(),
        })?;
    parse_symbols(&list, MarketFilter::Only(market)).map_err(|e| ValuescopeError::ConfigInvalid {
        section,
        key: "symbols".to_string(),
        reason: e.to_string(),
    })
}
