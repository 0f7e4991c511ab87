//! Ranker/Filter: market filter, disqualification removal, ordering and
//! truncation of scored securities.

use std::cmp::Ordering;

use crate::domain::market::MarketFilter;
use crate::domain::scorer::ScoredSecurity;

/// Result size used when the caller does not ask for one.
pub const DEFAULT_TOP_N: usize = 20;

/// Passing rows in the requested markets, best composite score first,
/// ties broken by symbol. An empty result is a valid outcome.
pub fn rank(
    scored: &[ScoredSecurity],
    filter: MarketFilter,
    top_n: Option<usize>,
) -> Vec<ScoredSecurity> {
    let mut ranked: Vec<ScoredSecurity> = scored
        .iter()
        .filter(|s| filter.includes_symbol(s.symbol()))
        .filter(|s| s.passed())
        .cloned()
        .collect();

    ranked.sort_by(compare_ranked);
    ranked.truncate(top_n.unwrap_or(DEFAULT_TOP_N));
    ranked
}

fn compare_ranked(a: &ScoredSecurity, b: &ScoredSecurity) -> Ordering {
    // Only passing rows reach here, so both scores are present.
    let sa = a.score().unwrap_or(f64::NEG_INFINITY);
    let sb = b.score().unwrap_or(f64::NEG_INFINITY);
    sb.total_cmp(&sa).then_with(|| a.symbol().cmp(b.symbol()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fundamentals::{CanonicalMetric, Completeness, MetricValue, UndefinedReason};
    use crate::domain::market::Market;
    use crate::domain::scorer::Verdict;

    fn scored(symbol: &str, verdict: Verdict) -> ScoredSecurity {
        let undefined = MetricValue::Undefined(UndefinedReason::Missing);
        ScoredSecurity {
            metric: CanonicalMetric {
                symbol: symbol.into(),
                as_of: None,
                currency: "USD".into(),
                price: MetricValue::Defined(10.0),
                pe_ratio: undefined,
                pb_ratio: undefined,
                dividend_yield: undefined,
                roe: undefined,
                market_value: undefined,
                fx_rate: MetricValue::Defined(1.0),
                dividend_per_share: None,
                sector: None,
                completeness: Completeness::default(),
            },
            preset: "value".into(),
            verdict,
        }
    }

    fn pass(symbol: &str, score: f64) -> ScoredSecurity {
        scored(symbol, Verdict::Pass { score })
    }

    fn fail(symbol: &str) -> ScoredSecurity {
        scored(
            symbol,
            Verdict::Fail {
                reason: "P/E undefined (missing input)".into(),
            },
        )
    }

    fn symbols(ranked: &[ScoredSecurity]) -> Vec<&str> {
        ranked.iter().map(|s| s.symbol()).collect()
    }

    #[test]
    fn sorts_descending_with_symbol_tie_break() {
        let input = vec![pass("MSFT", 50.0), pass("KO", 70.0), pass("AAPL", 70.0)];
        let ranked = rank(&input, MarketFilter::All, None);
        assert_eq!(symbols(&ranked), vec!["AAPL", "KO", "MSFT"]);
    }

    #[test]
    fn drops_failed_rows() {
        let input = vec![fail("AAA"), pass("BBB", 10.0)];
        let ranked = rank(&input, MarketFilter::All, None);
        assert_eq!(symbols(&ranked), vec!["BBB"]);
    }

    #[test]
    fn filters_by_market() {
        let input = vec![pass("7203.T", 60.0), pass("AAPL", 80.0), pass("D05.SI", 70.0)];
        let ranked = rank(&input, MarketFilter::Only(Market::Japan), None);
        assert_eq!(symbols(&ranked), vec!["7203.T"]);
        let ranked = rank(&input, MarketFilter::Only(Market::Asean), None);
        assert_eq!(symbols(&ranked), vec!["D05.SI"]);
    }

    #[test]
    fn truncates_to_top_n() {
        let input: Vec<_> = (0..30).map(|i| pass(&format!("S{:02}", i), i as f64)).collect();
        assert_eq!(rank(&input, MarketFilter::All, None).len(), DEFAULT_TOP_N);
        let top3 = rank(&input, MarketFilter::All, Some(3));
        assert_eq!(symbols(&top3), vec!["S29", "S28", "S27"]);
    }

    #[test]
    fn empty_when_nothing_passes() {
        let input = vec![fail("A"), fail("B")];
        assert!(rank(&input, MarketFilter::All, Some(5)).is_empty());
        assert!(rank(&[], MarketFilter::All, None).is_empty());
    }
}
