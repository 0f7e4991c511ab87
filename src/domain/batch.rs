//! Batch acquisition: fetch and normalize a symbol universe.
//!
//! Provider calls run on a bounded rayon pool. Each call is awaited with a
//! deadline; a call that misses it degrades its symbol and the batch moves
//! on. An abandoned call keeps its slot until the provider returns, so the
//! provider never sees more than `concurrency` calls at once.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::domain::error::ValuescopeError;
use crate::domain::fundamentals::{CanonicalMetric, RawFundamentals};
use crate::domain::normalizer::{FxTable, normalize};
use crate::ports::market_data_port::MarketDataPort;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Maximum number of provider calls in flight.
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DegradeReason {
    FetchFailed(String),
    InvalidData(String),
    Timeout { millis: u64 },
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::FetchFailed(reason) => write!(f, "fetch failed: {}", reason),
            DegradeReason::InvalidData(reason) => write!(f, "invalid data: {}", reason),
            DegradeReason::Timeout { millis } => write!(f, "timed out after {}ms", millis),
        }
    }
}

impl From<ValuescopeError> for DegradeReason {
    fn from(err: ValuescopeError) -> Self {
        match err {
            ValuescopeError::Timeout { millis, .. } => DegradeReason::Timeout { millis },
            ValuescopeError::InvalidData { reason, .. } => DegradeReason::InvalidData(reason),
            ValuescopeError::DataFetch { reason, .. } => DegradeReason::FetchFailed(reason),
            other => DegradeReason::FetchFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DegradedSymbol {
    pub symbol: String,
    pub reason: DegradeReason,
}

/// Run summary attached to every output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub requested: usize,
    pub succeeded: usize,
    pub degraded: Vec<DegradedSymbol>,
    /// Succeeded symbols with at least one undefined metric.
    pub incomplete: usize,
    /// Currencies for which no conversion rate could be obtained.
    pub missing_fx: Vec<String>,
}

impl BatchReport {
    /// Symbols were requested and none of them produced a metric.
    pub fn all_failed(&self) -> bool {
        self.requested > 0 && self.succeeded == 0
    }

    pub fn is_partial(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} requested, {} succeeded, {} degraded",
            self.requested,
            self.succeeded,
            self.degraded.len()
        );
        if self.incomplete > 0 {
            line.push_str(&format!(", {} with incomplete metrics", self.incomplete));
        }
        if !self.missing_fx.is_empty() {
            line.push_str(&format!(", no fx rate for {}", self.missing_fx.join(", ")));
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub metrics: Vec<CanonicalMetric>,
    pub fx: FxTable,
    pub report: BatchReport,
}

/// Fetch fundamentals for `symbols`, convert into `reporting_currency` and
/// normalize. Duplicate symbols are fetched once; output order follows the
/// first occurrence of each symbol.
pub fn fetch_batch(
    provider: &Arc<dyn MarketDataPort>,
    symbols: &[String],
    reporting_currency: &str,
    settings: &FetchSettings,
) -> Result<Batch, ValuescopeError> {
    let batch = fetch_batch_with_currencies(provider, symbols, &[], reporting_currency, settings)?;
    if batch.report.all_failed() {
        return Err(ValuescopeError::AllSymbolsFailed {
            requested: batch.report.requested,
        });
    }
    Ok(batch)
}

/// As [`fetch_batch`], additionally resolving conversion rates for
/// `currencies` (cash positions, cost bases) that no fetched symbol quotes in.
/// A batch in which every symbol degraded is returned as is; the caller
/// decides whether anything usable remains.
pub fn fetch_batch_with_currencies(
    provider: &Arc<dyn MarketDataPort>,
    symbols: &[String],
    currencies: &[String],
    reporting_currency: &str,
    settings: &FetchSettings,
) -> Result<Batch, ValuescopeError> {
    let symbols = dedupe(symbols);
    let mut report = BatchReport {
        requested: symbols.len(),
        ..BatchReport::default()
    };
    let mut fx = FxTable::new(reporting_currency);

    if symbols.is_empty() && currencies.is_empty() {
        return Ok(Batch {
            metrics: Vec::new(),
            fx,
            report,
        });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.concurrency.max(1))
        .build()
        .map_err(|e| ValuescopeError::Io(std::io::Error::other(e.to_string())))?;

    let limit = CallLimit::new(settings.concurrency.max(1));

    tracing::info!(
        symbols = symbols.len(),
        concurrency = settings.concurrency.max(1),
        "fetching fundamentals"
    );

    let fetched: Vec<(String, Result<RawFundamentals, ValuescopeError>)> = pool.install(|| {
        symbols
            .par_iter()
            .map(|symbol| {
                let owned = symbol.clone();
                let result =
                    call_with_timeout(provider, &limit, symbol, settings.timeout, move |p| {
                        p.fetch_fundamentals(&owned)
                    });
                (symbol.clone(), result)
            })
            .collect()
    });

    let mut raws = Vec::with_capacity(fetched.len());
    for (symbol, result) in fetched {
        match result {
            Ok(raw) => raws.push(raw),
            Err(err) => degrade(&mut report, symbol, err),
        }
    }

    let currencies: BTreeSet<String> = raws
        .iter()
        .map(|r| r.currency.as_str())
        .chain(currencies.iter().map(String::as_str))
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty() && c.as_str() != fx.reporting_currency())
        .collect();
    let target = fx.reporting_currency().to_string();
    let rates: Vec<(String, Result<f64, ValuescopeError>)> = pool.install(|| {
        currencies
            .par_iter()
            .map(|currency| {
                let (from, to) = (currency.clone(), target.clone());
                let label = format!("{}/{}", currency, target);
                let result =
                    call_with_timeout(provider, &limit, &label, settings.timeout, move |p| {
                        p.fetch_fx_rate(&from, &to)
                    });
                (currency.clone(), result)
            })
            .collect()
    });
    for (currency, result) in rates {
        match result {
            Ok(rate) if rate.is_finite() && rate > 0.0 => fx.insert(&currency, rate),
            Ok(rate) => {
                tracing::warn!(currency = %currency, rate, "ignoring unusable fx rate");
                report.missing_fx.push(currency);
            }
            Err(err) => {
                tracing::warn!(currency = %currency, error = %err, "fx rate unavailable");
                report.missing_fx.push(currency);
            }
        }
    }

    let mut metrics = Vec::with_capacity(raws.len());
    for raw in &raws {
        match normalize(raw, &fx) {
            Ok(metric) => {
                if !metric.completeness.is_complete() {
                    report.incomplete += 1;
                    tracing::debug!(
                        symbol = %metric.symbol,
                        undefined = metric.completeness.undefined.len(),
                        "incomplete metrics"
                    );
                }
                metrics.push(metric);
            }
            Err(err) => degrade(&mut report, raw.symbol.clone(), err),
        }
    }
    report.succeeded = metrics.len();

    tracing::info!(
        requested = report.requested,
        succeeded = report.succeeded,
        degraded = report.degraded.len(),
        "batch complete"
    );

    Ok(Batch {
        metrics,
        fx,
        report,
    })
}

fn degrade(report: &mut BatchReport, symbol: String, err: ValuescopeError) {
    let reason = DegradeReason::from(err);
    tracing::warn!(symbol = %symbol, reason = %reason, "symbol degraded");
    report.degraded.push(DegradedSymbol { symbol, reason });
}

fn dedupe(symbols: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

/// Counts provider calls in flight, abandoned ones included.
struct CallLimit {
    in_flight: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// One occupied slot; released when the provider call returns.
struct Permit {
    limit: Arc<CallLimit>,
}

impl CallLimit {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            in_flight: Mutex::new(0),
            released: Condvar::new(),
            capacity,
        })
    }

    /// Waits for a free slot until `deadline`.
    fn acquire(self: &Arc<Self>, deadline: Instant) -> Option<Permit> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_flight >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .released
                .wait_timeout(in_flight, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            in_flight = guard;
        }
        *in_flight += 1;
        Some(Permit {
            limit: Arc::clone(self),
        })
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut in_flight = self
            .limit
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.limit.released.notify_one();
    }
}

/// Runs `call` on its own thread and waits at most `timeout`, slot wait
/// included. A call that overruns is abandoned: its thread finishes in the
/// background, holding its slot, and its result is dropped.
fn call_with_timeout<T, F>(
    provider: &Arc<dyn MarketDataPort>,
    limit: &Arc<CallLimit>,
    label: &str,
    timeout: Duration,
    call: F,
) -> Result<T, ValuescopeError>
where
    T: Send + 'static,
    F: FnOnce(&dyn MarketDataPort) -> Result<T, ValuescopeError> + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let timed_out = || ValuescopeError::Timeout {
        symbol: label.to_string(),
        millis: timeout.as_millis() as u64,
    };

    let permit = limit.acquire(deadline).ok_or_else(|| {
        tracing::debug!(symbol = %label, "no free provider slot before deadline");
        timed_out()
    })?;

    let (tx, rx) = mpsc::channel();
    let provider = Arc::clone(provider);
    thread::Builder::new()
        .name(format!("fetch-{}", label))
        .spawn(move || {
            let _permit = permit;
            let _ = tx.send(call(provider.as_ref()));
        })
        .map_err(|e| ValuescopeError::DataFetch {
            symbol: label.to_string(),
            reason: e.to_string(),
        })?;

    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(timed_out()),
        Err(RecvTimeoutError::Disconnected) => Err(ValuescopeError::DataFetch {
            symbol: label.to_string(),
            reason: "provider call aborted".to_string(),
        }),
    }
}
