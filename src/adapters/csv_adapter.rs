//! CSV market data adapter.
//!
//! Reads `fundamentals.csv` and, when present, `fx_rates.csv` from a data
//! directory. Columns are located by header name. A malformed row only
//! affects its own symbol: it is reported as invalid data when that symbol
//! is fetched.

use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::RawFundamentals;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FUNDAMENTALS_FILE: &str = "fundamentals.csv";
pub const FX_RATES_FILE: &str = "fx_rates.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
    fundamentals: HashMap<String, Result<RawFundamentals, String>>,
    fx_rates: HashMap<(String, String), f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Result<Self, ValuescopeError> {
        let fundamentals = load_fundamentals(&base_path.join(FUNDAMENTALS_FILE))?;
        let fx_path = base_path.join(FX_RATES_FILE);
        let fx_rates = if fx_path.exists() {
            load_fx_rates(&fx_path)?
        } else {
            tracing::debug!(path = %fx_path.display(), "no fx rate file");
            HashMap::new()
        };
        tracing::debug!(
            path = %base_path.display(),
            symbols = fundamentals.len(),
            fx_pairs = fx_rates.len(),
            "loaded csv market data"
        );
        Ok(Self {
            base_path,
            fundamentals,
            fx_rates,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.fundamentals.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, ValuescopeError> {
        match self.fundamentals.get(&symbol.trim().to_uppercase()) {
            Some(Ok(raw)) => Ok(raw.clone()),
            Some(Err(reason)) => Err(ValuescopeError::InvalidData {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            }),
            None => Err(ValuescopeError::DataFetch {
                symbol: symbol.to_string(),
                reason: format!("no row in {}", FUNDAMENTALS_FILE),
            }),
        }
    }

    fn fetch_fx_rate(&self, from: &str, to: &str) -> Result<f64, ValuescopeError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return Ok(1.0);
        }
        if let Some(rate) = self.fx_rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }
        if let Some(rate) = self.fx_rates.get(&(to.clone(), from.clone())) {
            return Ok(1.0 / rate);
        }
        Err(ValuescopeError::DataFetch {
            symbol: format!("{}/{}", from, to),
            reason: format!("no rate in {}", FX_RATES_FILE),
        })
    }
}

fn read_file(path: &Path) -> Result<String, ValuescopeError> {
    fs::read_to_string(path).map_err(|e| ValuescopeError::DataFetch {
        symbol: "*".to_string(),
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn required_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize, ValuescopeError> {
    column(headers, name).ok_or_else(|| ValuescopeError::DataFetch {
        symbol: "*".to_string(),
        reason: format!("{} has no '{}' column", path.display(), name),
    })
}

fn cell<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn optional_number(
    record: &StringRecord,
    index: Option<usize>,
    name: &str,
) -> Result<Option<f64>, String> {
    match cell(record, index) {
        None => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("invalid {} value '{}'", name, v)),
    }
}

struct FundamentalsColumns {
    symbol: usize,
    currency: usize,
    price: Option<usize>,
    eps: Option<usize>,
    bps: Option<usize>,
    dps: Option<usize>,
    roe: Option<usize>,
    market_cap: Option<usize>,
    sector: Option<usize>,
    as_of: Option<usize>,
}

fn load_fundamentals(
    path: &Path,
) -> Result<HashMap<String, Result<RawFundamentals, String>>, ValuescopeError> {
    let content = read_file(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| ValuescopeError::DataFetch {
            symbol: "*".to_string(),
            reason: format!("CSV parse error: {}", e),
        })?
        .clone();
    let columns = FundamentalsColumns {
        symbol: required_column(&headers, "symbol", path)?,
        currency: required_column(&headers, "currency", path)?,
        price: column(&headers, "price"),
        eps: column(&headers, "eps"),
        bps: column(&headers, "bps"),
        dps: column(&headers, "dps"),
        roe: column(&headers, "roe"),
        market_cap: column(&headers, "market_cap"),
        sector: column(&headers, "sector"),
        as_of: column(&headers, "as_of"),
    };

    let mut rows = HashMap::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = line + 2, error = %e, "skipping unreadable row");
                continue;
            }
        };
        let Some(symbol) = cell(&record, Some(columns.symbol)) else {
            tracing::warn!(line = line + 2, "skipping row without symbol");
            continue;
        };
        let symbol = symbol.to_uppercase();
        if rows.contains_key(&symbol) {
            tracing::warn!(symbol = %symbol, "duplicate row ignored");
            continue;
        }
        let parsed = parse_fundamentals(&record, &columns, &symbol);
        rows.insert(symbol, parsed);
    }
    Ok(rows)
}

fn parse_fundamentals(
    record: &StringRecord,
    columns: &FundamentalsColumns,
    symbol: &str,
) -> Result<RawFundamentals, String> {
    let currency = cell(record, Some(columns.currency)).ok_or("missing currency")?;
    let mut raw = RawFundamentals::new(symbol, currency);
    raw.price = optional_number(record, columns.price, "price")?;
    raw.eps = optional_number(record, columns.eps, "eps")?;
    raw.book_value_per_share = optional_number(record, columns.bps, "bps")?;
    raw.dividend_per_share = optional_number(record, columns.dps, "dps")?;
    raw.roe = optional_number(record, columns.roe, "roe")?;
    raw.market_cap = optional_number(record, columns.market_cap, "market_cap")?;
    raw.sector = cell(record, columns.sector).map(str::to_string);
    raw.as_of = match cell(record, columns.as_of) {
        None => None,
        Some(d) => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|e| format!("invalid as_of date '{}': {}", d, e))?,
        ),
    };
    Ok(raw)
}

fn load_fx_rates(path: &Path) -> Result<HashMap<(String, String), f64>, ValuescopeError> {
    let content = read_file(path)?;
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| ValuescopeError::DataFetch {
            symbol: "*".to_string(),
            reason: format!("CSV parse error: {}", e),
        })?
        .clone();
    let from = required_column(&headers, "from", path)?;
    let to = required_column(&headers, "to", path)?;
    let rate = required_column(&headers, "rate", path)?;

    let mut rates = HashMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| ValuescopeError::DataFetch {
            symbol: "*".to_string(),
            reason: format!("CSV parse error: {}", e),
        })?;
        let (Some(f), Some(t), Some(r)) = (
            cell(&record, Some(from)),
            cell(&record, Some(to)),
            cell(&record, Some(rate)),
        ) else {
            continue;
        };
        match r.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => {
                rates.insert((f.to_uppercase(), t.to_uppercase()), value);
            }
            _ => tracing::warn!(from = f, to = t, rate = r, "ignoring unusable fx rate"),
        }
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let fundamentals = "symbol,currency,price,eps,bps,dps,roe,market_cap,sector,as_of\n\
            7203.T,JPY,2500,250,3000,75,0.11,40000000000000,Consumer Cyclical,2024-06-28\n\
            AAPL,USD,200,6.5,4.2,1.0,1.5,3000000000000,Technology,\n\
            BROKEN,USD,abc,1,1,,,,,\n\
            SPARSE,USD,10,,,,,,,\n";
        fs::write(path.join(FUNDAMENTALS_FILE), fundamentals).unwrap();
        fs::write(path.join(FX_RATES_FILE), "from,to,rate\nUSD,JPY,150\nSGD,JPY,0\n").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_fundamentals_returns_row() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).unwrap();

        let raw = adapter.fetch_fundamentals("7203.T").unwrap();
        assert_eq!(raw.currency, "JPY");
        assert_eq!(raw.price, Some(2500.0));
        assert_eq!(raw.eps, Some(250.0));
        assert_eq!(raw.book_value_per_share, Some(3000.0));
        assert_eq!(raw.dividend_per_share, Some(75.0));
        assert_eq!(raw.roe, Some(0.11));
        assert_eq!(raw.sector.as_deref(), Some("Consumer Cyclical"));
        assert_eq!(raw.as_of, NaiveDate::from_ymd_opt(2024, 6, 28));
    }

    #[test]
    fn empty_cells_are_missing() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).unwrap();
        let raw = adapter.fetch_fundamentals("sparse").unwrap();
        assert_eq!(raw.price, Some(10.0));
        assert_eq!(raw.eps, None);
        assert_eq!(raw.sector, None);
        assert_eq!(raw.as_of, None);
    }

    #[test]
    fn malformed_row_is_invalid_data_for_that_symbol_only() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).unwrap();
        let err = adapter.fetch_fundamentals("BROKEN").unwrap_err();
        assert!(matches!(err, ValuescopeError::InvalidData { ref reason, .. } if reason.contains("price")));
        assert!(adapter.fetch_fundamentals("AAPL").is_ok());
    }

    #[test]
    fn unknown_symbol_is_fetch_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).unwrap();
        let err = adapter.fetch_fundamentals("ZZZZ").unwrap_err();
        assert!(matches!(err, ValuescopeError::DataFetch { .. }));
    }

    #[test]
    fn fx_rates_support_inverse_pairs() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).unwrap();
        assert_eq!(adapter.fetch_fx_rate("usd", "jpy").unwrap(), 150.0);
        assert!((adapter.fetch_fx_rate("JPY", "USD").unwrap() - 1.0 / 150.0).abs() < 1e-15);
        assert_eq!(adapter.fetch_fx_rate("JPY", "JPY").unwrap(), 1.0);
        assert!(adapter.fetch_fx_rate("SGD", "JPY").is_err());
    }

    #[test]
    fn missing_fx_file_is_allowed() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(FUNDAMENTALS_FILE),
            "symbol,currency,price\nAAPL,USD,200\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf()).unwrap();
        assert!(adapter.fetch_fx_rate("USD", "JPY").is_err());
        assert_eq!(adapter.symbols(), vec!["AAPL"]);
    }

    #[test]
    fn missing_fundamentals_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CsvAdapter::new(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn missing_required_column_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(FUNDAMENTALS_FILE), "symbol,price\nAAPL,200\n").unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf()).err().unwrap();
        assert!(matches!(err, ValuescopeError::DataFetch { ref reason, .. } if reason.contains("currency")));
    }
}
