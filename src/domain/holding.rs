//! Portfolio holdings.

const CASH_SUFFIX: &str = ".CASH";

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    /// Average acquisition price per share, in `currency`.
    pub cost_basis: f64,
    pub currency: String,
}

impl Holding {
    pub fn new(symbol: &str, quantity: f64, cost_basis: f64, currency: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            quantity,
            cost_basis,
            currency: currency.trim().to_uppercase(),
        }
    }

    /// Cash positions such as `JPY.CASH` carry no price risk.
    pub fn is_cash(&self) -> bool {
        self.symbol.to_uppercase().ends_with(CASH_SUFFIX)
    }

    /// Currency of a cash position, taken from its symbol.
    pub fn cash_currency(&self) -> Option<String> {
        if !self.is_cash() {
            return None;
        }
        let upper = self.symbol.to_uppercase();
        Some(upper[..upper.len() - CASH_SUFFIX.len()].to_string())
    }

    pub fn cost_value(&self) -> f64 {
        self.quantity * self.cost_basis
    }
}
