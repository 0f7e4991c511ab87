#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use valuescope::domain::error::ValuescopeError;
use valuescope::domain::fundamentals::RawFundamentals;
use valuescope::domain::holding::Holding;
use valuescope::ports::market_data_port::MarketDataPort;
use valuescope::ports::portfolio_port::PortfolioPort;

pub struct MockDataPort {
    pub data: HashMap<String, RawFundamentals>,
    pub errors: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
    /// Units of the keyed currency per unit of the target currency.
    pub fx: HashMap<(String, String), f64>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delays: HashMap::new(),
            fx: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most fundamentals calls observed inside the provider at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn with_fundamentals(mut self, raw: RawFundamentals) -> Self {
        self.data.insert(raw.symbol.clone(), raw);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_fx(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.fx.insert((from.to_string(), to.to_string()), rate);
        self
    }

    pub fn shared(self) -> Arc<dyn MarketDataPort> {
        Arc::new(self)
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, ValuescopeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(symbol) {
            thread::sleep(*delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ValuescopeError::DataFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| ValuescopeError::DataFetch {
                symbol: symbol.to_string(),
                reason: "unknown symbol".to_string(),
            })
    }

    fn fetch_fx_rate(&self, from: &str, to: &str) -> Result<f64, ValuescopeError> {
        if from == to {
            return Ok(1.0);
        }
        self.fx
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| ValuescopeError::DataFetch {
                symbol: format!("{}/{}", from, to),
                reason: "no rate".to_string(),
            })
    }
}

pub struct MockPortfolio {
    pub holdings: Vec<Holding>,
}

impl MockPortfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }
}

impl PortfolioPort for MockPortfolio {
    fn load_holdings(&self) -> Result<Vec<Holding>, ValuescopeError> {
        Ok(self.holdings.clone())
    }
}

/// Fundamentals giving the requested P/E and P/B at the given price.
pub fn make_fundamentals(symbol: &str, currency: &str, price: f64, pe: f64, pb: f64) -> RawFundamentals {
    let mut raw = RawFundamentals::new(symbol, currency);
    raw.price = Some(price);
    raw.eps = Some(price / pe);
    raw.book_value_per_share = Some(price / pb);
    raw.dividend_per_share = Some(price * 0.03);
    raw.roe = Some(0.10);
    raw.sector = Some("Industrials".to_string());
    raw
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
