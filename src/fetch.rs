use chrono::NaiveDate;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analysis::calculate_returns;
use crate::provider::{Fundamentals, MarketDataProvider};
use crate::series::{ReturnCollection, TimeSeries};
use crate::Result;

/// Prices and returns for the tickers that had price data, keyed by ticker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketData {
    pub prices: IndexMap<String, TimeSeries>,
    pub returns: ReturnCollection,
}

/// Fetch monthly adjusted closes for one ticker.
///
/// Never fails: a provider error is logged and reported as an empty series,
/// so callers check `is_empty()` for the "no data" case.
pub fn fetch_price_data(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> TimeSeries {
    match provider.monthly_prices(ticker, start, end) {
        Ok(prices) => {
            debug!(ticker, provider = provider.name(), points = prices.len(), "fetched prices");
            prices
        }
        Err(err) => {
            warn!(ticker, provider = provider.name(), error = %err, "price fetch failed");
            TimeSeries::new()
        }
    }
}

/// Fetch prices for every ticker and derive their returns.
///
/// Tickers without price data are left out of both maps. With `concurrent`
/// the fetches run on the rayon pool; results are still keyed by ticker in
/// input order.
pub fn get_all_data(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    concurrent: bool,
) -> MarketData {
    let fetch = |ticker: &String| (ticker.clone(), fetch_price_data(provider, ticker, start, end));

    let fetched: Vec<(String, TimeSeries)> = if concurrent {
        tickers.par_iter().map(fetch).collect()
    } else {
        tickers.iter().map(fetch).collect()
    };

    let mut data = MarketData::default();
    for (ticker, prices) in fetched {
        if prices.is_empty() {
            continue;
        }
        data.returns.insert(ticker.clone(), calculate_returns(&prices));
        data.prices.insert(ticker, prices);
    }

    data
}

/// Fetch fundamentals for each ticker, keeping each outcome.
pub fn fetch_fundamentals(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
) -> Vec<(String, Result<Fundamentals>)> {
    tickers
        .iter()
        .map(|ticker| {
            let outcome = provider.fundamentals(ticker);
            if let Err(err) = &outcome {
                debug!(
                    ticker,
                    provider = provider.name(),
                    error = %err,
                    "fundamentals fetch failed"
                );
            }
            (ticker.clone(), outcome)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Error;
    use std::collections::HashMap;

    /// In-memory provider for tests
    #[derive(Default)]
    pub(crate) struct StaticProvider {
        pub prices: HashMap<String, Vec<(NaiveDate, f64)>>,
        pub fundamentals: HashMap<String, Fundamentals>,
    }

    impl StaticProvider {
        pub fn with_prices(mut self, ticker: &str, closes: &[(u32, f64)]) -> Self {
            let points = closes
                .iter()
                .map(|(m, v)| (NaiveDate::from_ymd_opt(2024, *m, 1).unwrap(), *v))
                .collect();
            self.prices.insert(ticker.to_string(), points);
            self
        }

        pub fn with_fundamentals(mut self, record: Fundamentals) -> Self {
            self.fundamentals.insert(record.ticker.clone(), record);
            self
        }
    }

    impl MarketDataProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn monthly_prices(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<TimeSeries> {
            let points = self
                .prices
                .get(ticker)
                .ok_or_else(|| Error::Provider(format!("unknown ticker {}", ticker)))?;
            Ok(TimeSeries::monthly(
                points.iter().copied().filter(|(d, _)| *d >= start && *d < end),
            ))
        }

        fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
            self.fundamentals
                .get(ticker)
                .cloned()
                .ok_or_else(|| Error::Provider(format!("Quote not found for symbol: {}", ticker)))
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn sample_provider() -> StaticProvider {
        StaticProvider::default()
            .with_prices("AAA", &[(1, 100.0), (2, 110.0), (3, 121.0)])
            .with_prices("BBB", &[(1, 50.0), (2, 45.0), (3, 54.0)])
            .with_prices("ONE", &[(1, 10.0)])
    }

    #[test]
    fn test_fetch_price_data_error_is_empty() {
        let provider = sample_provider();
        let (start, end) = range();
        assert!(fetch_price_data(&provider, "MISSING", start, end).is_empty());
        assert_eq!(fetch_price_data(&provider, "AAA", start, end).len(), 3);
    }

    #[test]
    fn test_get_all_data_skips_tickers_without_prices() {
        let provider = sample_provider();
        let (start, end) = range();
        let requested = tickers(&["BBB", "MISSING", "AAA", "ONE"]);
        let data = get_all_data(&provider, &requested, start, end, false);

        let keys: Vec<_> = data.prices.keys().cloned().collect();
        assert_eq!(keys, vec!["BBB", "AAA", "ONE"]);
        let return_keys: Vec<_> = data.returns.keys().cloned().collect();
        assert_eq!(return_keys, keys);

        assert_eq!(data.returns["AAA"].len(), 2);
        assert!((data.returns["AAA"].values()[1] - 0.10).abs() < 1e-12);
        assert!(data.returns["ONE"].is_empty());
    }

    #[test]
    fn test_get_all_data_concurrent_matches_sequential() {
        let provider = sample_provider();
        let (start, end) = range();
        let list = tickers(&["ONE", "AAA", "MISSING", "BBB"]);
        let sequential = get_all_data(&provider, &list, start, end, false);
        let concurrent = get_all_data(&provider, &list, start, end, true);
        assert_eq!(sequential, concurrent);
    }

    #[test]
    fn test_fetch_fundamentals_keeps_failures() {
        let provider = StaticProvider::default().with_fundamentals(Fundamentals {
            company_name: Some("Triple A".to_string()),
            ..Fundamentals::new("AAA")
        });

        let outcomes = fetch_fundamentals(&provider, &tickers(&["AAA", "ZZZ"]));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, "AAA");
        assert!(outcomes[0].1.is_ok());
        assert_eq!(outcomes[1].0, "ZZZ");
        assert!(outcomes[1].1.is_err());
    }
}
