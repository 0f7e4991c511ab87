//! Portfolio loader port.

use crate::domain::error::ValuescopeError;
use crate::domain::holding::Holding;

pub trait PortfolioPort {
    fn load_holdings(&self) -> Result<Vec<Holding>, ValuescopeError>;
}
