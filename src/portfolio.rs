use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::series::{ReturnCollection, TimeSeries};
use crate::Result;

/// Equal-weighted portfolio over a set of tickers
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
}

impl Portfolio {
    /// Create a new portfolio with equal weights
    pub fn new(tickers: Vec<String>) -> Self {
        let n = tickers.len();
        let weight = if n > 0 { 1.0 / n as f64 } else { 0.0 };
        let weights = vec![weight; n];

        Portfolio { tickers, weights }
    }

    /// Calculate portfolio return given individual ticker returns
    pub fn calculate_portfolio_return(&self, returns: &[f64]) -> Result<f64> {
        if returns.len() != self.weights.len() {
            return Err(crate::Error::Other(
                "Returns length must match weights length".to_string(),
            ));
        }

        let portfolio_return: f64 = returns
            .iter()
            .zip(self.weights.iter())
            .map(|(r, w)| r * w)
            .sum();

        Ok(portfolio_return)
    }

    /// Get portfolio summary
    pub fn summary(&self) -> String {
        let mut summary = String::from("Portfolio Summary:\n");
        summary.push_str(&format!("Tickers: {}\n", self.tickers.len()));

        for (ticker, weight) in self.tickers.iter().zip(self.weights.iter()) {
            summary.push_str(&format!("  {} - {:.2}%\n", ticker, weight * 100.0));
        }

        summary
    }
}

/// Output of the equal-weighted aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReturns {
    pub portfolio: Portfolio,
    /// Per-period portfolio returns on the aligned dates
    pub returns: TimeSeries,
    /// Growth of one unit invested at the first aligned date
    pub cumulative: TimeSeries,
}

/// Dates present in every series of the collection, ascending.
pub fn common_dates(collection: &ReturnCollection) -> Vec<NaiveDate> {
    let mut series = collection.values();
    let Some(first) = series.next() else {
        return Vec::new();
    };

    let mut dates: BTreeSet<NaiveDate> = first.dates().collect();
    for s in series {
        dates.retain(|d| s.get(*d).is_some());
        if dates.is_empty() {
            break;
        }
    }

    dates.into_iter().collect()
}

/// Running product of `(1 + r)`, left to right.
pub fn cumulative_returns(returns: &TimeSeries) -> TimeSeries {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|(date, r)| {
            growth *= 1.0 + r;
            (date, growth)
        })
        .collect()
}

/// Combine per-ticker returns into an equal-weighted portfolio.
///
/// Series are aligned by inner join on date: a date missing from any ticker
/// is dropped for all of them. Returns `None` when the collection is empty or
/// no date survives the alignment; a `Some` result is never empty.
pub fn calculate_equal_weighted_returns(collection: &ReturnCollection) -> Option<PortfolioReturns> {
    if collection.is_empty() {
        debug!("no return series to aggregate");
        return None;
    }

    let dates = common_dates(collection);
    if dates.is_empty() {
        debug!(tickers = collection.len(), "no dates shared by all return series");
        return None;
    }

    let portfolio = Portfolio::new(collection.keys().cloned().collect());

    let mut points = Vec::with_capacity(dates.len());
    for date in dates {
        let row: Vec<f64> = collection
            .values()
            .map(|s| s.get(date))
            .collect::<Option<Vec<f64>>>()?;
        let value = portfolio.calculate_portfolio_return(&row).ok()?;
        points.push((date, value));
    }

    let returns = TimeSeries::from_points(points);
    let cumulative = cumulative_returns(&returns);

    debug!(
        tickers = portfolio.tickers.len(),
        periods = returns.len(),
        "aggregated equal-weighted portfolio"
    );

    Some(PortfolioReturns {
        portfolio,
        returns,
        cumulative,
    })
}
