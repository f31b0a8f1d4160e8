//! Market data providers.
//!
//! A provider answers two questions for a ticker: its monthly adjusted-close
//! history over a date range, and its fundamentals record. Callers in
//! [`crate::fetch`] decide how failures are surfaced.

mod local;
mod yahoo;

pub use local::LocalProvider;
pub use yahoo::{parse_chart_response, parse_quote_summary, YahooProvider};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::TimeSeries;
use crate::Result;

/// Fundamentals snapshot for one ticker. Fields the source does not report
/// stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub ticker: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub price_to_book: Option<f64>,
    pub beta: Option<f64>,
}

impl Fundamentals {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }
}

pub trait MarketDataProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Monthly adjusted closes with `start` inclusive and `end` exclusive.
    fn monthly_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries>;

    fn fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}

/// Provider settings, usually from the `[provider]` table of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}
