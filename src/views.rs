//! The two user actions, computed without any rendering.
//!
//! Each view collects the warnings the user should see instead of failing;
//! only invalid input stops an action, and it does so before any fetch.

use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::info;

use crate::analysis::{
    distribution_bin_size, distribution_stats, histogram, DistributionStats, HistogramBin,
};
use crate::error::InputError;
use crate::fetch::{fetch_fundamentals, get_all_data, MarketData};
use crate::portfolio::{calculate_equal_weighted_returns, PortfolioReturns};
use crate::provider::{Fundamentals, MarketDataProvider};
use crate::series::{ReturnCollection, TimeSeries};
use crate::ticker::{validate_date_range, validate_tickers};
use crate::Result;

/// Non-fatal problem shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    NoPriceData { ticker: String },
    InsufficientReturns { ticker: String },
    NoDistributions,
    InsufficientAlignedData,
    FundamentalsUnavailable { ticker: String, reason: String },
    NoFundamentals,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoPriceData { ticker } => write!(f, "No price data found for {}", ticker),
            Warning::InsufficientReturns { ticker } => {
                write!(f, "Not enough data to calculate returns for {}", ticker)
            }
            Warning::NoDistributions => {
                write!(f, "No tickers had enough data to generate a distribution.")
            }
            Warning::InsufficientAlignedData => {
                write!(f, "Not enough aligned data for portfolio return calculation.")
            }
            Warning::FundamentalsUnavailable { ticker, reason } => {
                write!(f, "Could not fetch fundamentals for {}: {}", ticker, reason)
            }
            Warning::NoFundamentals => write!(f, "No fundamentals data could be retrieved."),
        }
    }
}

/// Validated request plus everything fetched for it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedData {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub prices: IndexMap<String, TimeSeries>,
    pub returns: ReturnCollection,
    pub warnings: Vec<Warning>,
}

/// Validate the raw input and fetch prices for every ticker.
pub fn validate_and_fetch(
    provider: &dyn MarketDataProvider,
    tickers_input: &str,
    start: NaiveDate,
    end: NaiveDate,
    concurrent: bool,
) -> std::result::Result<FetchedData, InputError> {
    validate_date_range(start, end)?;
    let tickers = validate_tickers(tickers_input)?;

    info!(
        tickers = %tickers.join(","),
        %start,
        %end,
        provider = provider.name(),
        "fetching market data"
    );
    let MarketData { prices, returns } = get_all_data(provider, &tickers, start, end, concurrent);

    let warnings = tickers
        .iter()
        .filter(|t| !prices.contains_key(*t))
        .map(|t| Warning::NoPriceData { ticker: t.clone() })
        .collect();

    Ok(FetchedData {
        tickers,
        start,
        end,
        prices,
        returns,
        warnings,
    })
}

/// Prices and fundamentals for each requested ticker
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualView {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub prices: IndexMap<String, TimeSeries>,
    pub fundamentals: Vec<Fundamentals>,
    pub warnings: Vec<Warning>,
}

pub fn individual_view(provider: &dyn MarketDataProvider, data: &FetchedData) -> IndividualView {
    let mut warnings = data.warnings.clone();
    let mut fundamentals = Vec::new();

    for (ticker, outcome) in fetch_fundamentals(provider, &data.tickers) {
        match outcome {
            Ok(record) => fundamentals.push(record),
            Err(err) => warnings.push(Warning::FundamentalsUnavailable {
                ticker,
                reason: err.to_string(),
            }),
        }
    }

    if fundamentals.is_empty() {
        warnings.push(Warning::NoFundamentals);
    }

    IndividualView {
        start: data.start,
        end: data.end,
        prices: data.prices.clone(),
        fundamentals,
        warnings,
    }
}

/// A return distribution ready to plot
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub label: String,
    pub values: Vec<f64>,
    pub stats: DistributionStats,
    pub bins: Vec<HistogramBin>,
}

impl Distribution {
    fn new(label: impl Into<String>, values: Vec<f64>, bin_size: f64) -> Result<Self> {
        let stats = distribution_stats(&values)?;
        let bins = histogram(&values, bin_size);
        Ok(Self {
            label: label.into(),
            values,
            stats,
            bins,
        })
    }
}

/// Equal-weighted portfolio output of the portfolio view
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSection {
    pub result: PortfolioReturns,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioView {
    /// Every return series the aggregator saw
    pub returns: ReturnCollection,
    pub distributions: Vec<Distribution>,
    pub bin_size: f64,
    pub portfolio: Option<PortfolioSection>,
    pub warnings: Vec<Warning>,
}

/// Per-ticker distributions, then the equal-weighted portfolio.
///
/// A ticker needs more than one return to get a distribution. The aggregator
/// still sees every ticker that had price data, so a short series can leave
/// no aligned dates for the portfolio.
pub fn portfolio_view(data: &FetchedData) -> Result<PortfolioView> {
    let mut warnings = data.warnings.clone();

    let eligible: Vec<(&String, Vec<f64>)> = data
        .returns
        .iter()
        .filter_map(|(ticker, returns)| {
            if returns.len() > 1 {
                Some((ticker, returns.values()))
            } else {
                warnings.push(Warning::InsufficientReturns {
                    ticker: ticker.clone(),
                });
                None
            }
        })
        .collect();

    let bin_size = distribution_bin_size(eligible.len());

    if eligible.is_empty() {
        warnings.push(Warning::NoDistributions);
        return Ok(PortfolioView {
            returns: data.returns.clone(),
            distributions: Vec::new(),
            bin_size,
            portfolio: None,
            warnings,
        });
    }

    let distributions = eligible
        .into_iter()
        .map(|(ticker, values)| Distribution::new(ticker.as_str(), values, bin_size))
        .collect::<Result<Vec<_>>>()?;

    let portfolio = match calculate_equal_weighted_returns(&data.returns) {
        Some(result) => {
            let distribution = Distribution::new("Portfolio", result.returns.values(), bin_size)?;
            Some(PortfolioSection {
                result,
                distribution,
            })
        }
        None => {
            warnings.push(Warning::InsufficientAlignedData);
            None
        }
    };

    Ok(PortfolioView {
        returns: data.returns.clone(),
        distributions,
        bin_size,
        portfolio,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::StaticProvider;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    fn provider() -> StaticProvider {
        StaticProvider::default()
            .with_prices("AAA", &[(1, 100.0), (2, 110.0), (3, 115.5)])
            .with_prices("BBB", &[(1, 50.0), (2, 60.0), (3, 57.0)])
            .with_prices("ONE", &[(1, 10.0)])
            .with_prices("TWO", &[(5, 10.0), (6, 11.0)])
            .with_fundamentals(Fundamentals {
                company_name: Some("Triple A Corp".to_string()),
                ..Fundamentals::new("AAA")
            })
    }

    fn fetch(input: &str) -> FetchedData {
        let (start, end) = range();
        validate_and_fetch(&provider(), input, start, end, false).unwrap()
    }

    #[test]
    fn test_validate_and_fetch_rejects_blank_input() {
        let (start, end) = range();
        let err = validate_and_fetch(&provider(), "  ", start, end, false).unwrap_err();
        assert_eq!(err, InputError::EmptyTickers);
    }

    #[test]
    fn test_validate_and_fetch_rejects_duplicates() {
        let (start, end) = range();
        let err = validate_and_fetch(&provider(), "aaa, bbb, AAA", start, end, false).unwrap_err();
        assert_eq!(err, InputError::DuplicateTickers(vec!["AAA".to_string()]));
    }

    #[test]
    fn test_validate_and_fetch_rejects_inverted_range() {
        let (start, end) = range();
        let err = validate_and_fetch(&provider(), "aaa", end, start, false).unwrap_err();
        assert!(matches!(err, InputError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_validate_and_fetch_warns_on_missing_data() {
        let data = fetch("aaa, zzz");
        assert_eq!(data.tickers, vec!["AAA", "ZZZ"]);
        assert_eq!(
            data.warnings,
            vec![Warning::NoPriceData {
                ticker: "ZZZ".to_string()
            }]
        );
        assert!(data.prices.contains_key("AAA"));
        assert!(!data.returns.contains_key("ZZZ"));
    }

    #[test]
    fn test_individual_view_collects_fundamentals_failures() {
        let data = fetch("aaa, bbb");
        let view = individual_view(&provider(), &data);
        assert_eq!(view.fundamentals.len(), 1);
        assert_eq!(view.fundamentals[0].company_name.as_deref(), Some("Triple A Corp"));
        assert_eq!(view.prices.len(), 2);
        assert_eq!(view.warnings.len(), 1);
        assert_eq!(
            view.warnings[0].to_string(),
            "Could not fetch fundamentals for BBB: Provider error: Quote not found for symbol: BBB"
        );
    }

    #[test]
    fn test_individual_view_without_any_fundamentals() {
        let data = fetch("bbb");
        let view = individual_view(&provider(), &data);
        assert!(view.fundamentals.is_empty());
        assert_eq!(view.warnings.last(), Some(&Warning::NoFundamentals));
    }

    #[test]
    fn test_portfolio_view_two_tickers() {
        let data = fetch("aaa, bbb");
        let view = portfolio_view(&data).unwrap();

        assert!(view.warnings.is_empty());
        assert_eq!(view.distributions.len(), 2);
        assert!((view.bin_size - 0.015).abs() < 1e-12);

        let section = view.portfolio.unwrap();
        let returns = section.result.returns.values();
        // AAA: +10%, +5%; BBB: +20%, -5%
        assert!((returns[0] - 0.15).abs() < 1e-12);
        assert!((returns[1] - 0.0).abs() < 1e-12);
        let cumulative = section.result.cumulative.values();
        assert!((cumulative[1] - 1.15).abs() < 1e-12);
        assert_eq!(section.distribution.label, "Portfolio");
        assert_eq!(section.distribution.stats.count, 2);
    }

    #[test]
    fn test_portfolio_view_short_series_collapses_portfolio() {
        let data = fetch("aaa, one");
        let view = portfolio_view(&data).unwrap();

        assert_eq!(view.distributions.len(), 1);
        assert!(view.portfolio.is_none());
        assert_eq!(
            view.warnings,
            vec![
                Warning::InsufficientReturns {
                    ticker: "ONE".to_string()
                },
                Warning::InsufficientAlignedData,
            ]
        );
    }

    #[test]
    fn test_portfolio_view_no_distributions() {
        let data = fetch("one, two");
        let view = portfolio_view(&data).unwrap();

        assert!(view.distributions.is_empty());
        assert!(view.portfolio.is_none());
        assert_eq!(view.warnings.last(), Some(&Warning::NoDistributions));
        assert!(!view.warnings.contains(&Warning::InsufficientAlignedData));
    }

    #[test]
    fn test_portfolio_view_disjoint_history() {
        let provider = StaticProvider::default()
            .with_prices("EARLY", &[(1, 10.0), (2, 11.0), (3, 12.0)])
            .with_prices("LATE", &[(7, 10.0), (8, 11.0), (9, 12.0)]);
        let (start, end) = range();
        let data = validate_and_fetch(&provider, "early, late", start, end, true).unwrap();
        let view = portfolio_view(&data).unwrap();

        assert_eq!(view.distributions.len(), 2);
        assert!(view.portfolio.is_none());
        assert_eq!(view.warnings, vec![Warning::InsufficientAlignedData]);
    }
}
