//! Market data provider port.

use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::RawFundamentals;

/// Supplies raw per-security fundamentals and conversion rates. Any call
/// may fail; callers degrade the affected symbol rather than the batch.
pub trait MarketDataPort: Send + Sync {
    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, ValuescopeError>;

    /// Units of `to` per one unit of `from`.
    fn fetch_fx_rate(&self, from: &str, to: &str) -> Result<f64, ValuescopeError>;
}
