//! CSV portfolio loader: `symbol,shares,cost_price,currency`.

use crate::domain::error::ValuescopeError;
use crate::domain::holding::Holding;
use crate::ports::portfolio_port::PortfolioPort;
use std::fs;
use std::path::PathBuf;

pub struct PortfolioCsvAdapter {
    path: PathBuf,
}

impl PortfolioCsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PortfolioPort for PortfolioCsvAdapter {
    fn load_holdings(&self) -> Result<Vec<Holding>, ValuescopeError> {
        let content = fs::read_to_string(&self.path).map_err(|e| ValuescopeError::Portfolio {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut holdings = Vec::new();

        for (index, result) in rdr.records().enumerate() {
            let line = index + 2;
            let record = result.map_err(|e| ValuescopeError::Portfolio {
                reason: format!("CSV parse error: {}", e),
            })?;
            let field = |i: usize, name: &str| {
                record
                    .get(i)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| ValuescopeError::Portfolio {
                        reason: format!("line {}: missing {}", line, name),
                    })
            };
            let number = |i: usize, name: &str| -> Result<f64, ValuescopeError> {
                let raw = field(i, name)?;
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ValuescopeError::Portfolio {
                        reason: format!("line {}: invalid {} '{}'", line, name, raw),
                    })
            };

            let symbol = field(0, "symbol")?;
            let shares = number(1, "shares")?;
            if shares < 0.0 {
                return Err(ValuescopeError::Portfolio {
                    reason: format!("line {}: negative shares for {}", line, symbol),
                });
            }
            let cost_price = number(2, "cost_price")?;
            let currency = field(3, "currency")?;
            holdings.push(Holding::new(symbol, shares, cost_price, currency));
        }

        tracing::debug!(path = %self.path.display(), holdings = holdings.len(), "loaded portfolio");
        Ok(holdings)
    }
}
