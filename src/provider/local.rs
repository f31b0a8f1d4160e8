use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{Fundamentals, MarketDataProvider};
use crate::series::TimeSeries;
use crate::{Error, Result};

const FUNDAMENTALS_FILE: &str = "fundamentals.csv";

/// Reads market data from CSV files in a directory.
///
/// Prices: `{TICKER}.csv` with columns `date,adj_close`.
/// Fundamentals: a single `fundamentals.csv` keyed by the `ticker` column.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    adj_close: Option<f64>,
}

impl LocalProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();

        if !data_dir.exists() {
            return Err(Error::Other(format!(
                "Directory does not exist: {}",
                data_dir.display()
            )));
        }

        if !data_dir.is_dir() {
            return Err(Error::Other(format!(
                "Path is not a directory: {}",
                data_dir.display()
            )));
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn price_path(&self, ticker: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker))
    }
}

impl MarketDataProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn monthly_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        let path = self.price_path(ticker);
        if !path.is_file() {
            return Err(Error::Provider(format!(
                "no price file for {} at {}",
                ticker,
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut points = Vec::new();
        for row in reader.deserialize() {
            let row: PriceRow = row?;
            if row.date < start || row.date >= end {
                continue;
            }
            if let Some(close) = row.adj_close.filter(|c| c.is_finite()) {
                points.push((row.date, close));
            }
        }

        debug!(ticker, rows = points.len(), path = %path.display(), "loaded local prices");
        Ok(TimeSeries::monthly(points))
    }

    fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let path = self.data_dir.join(FUNDAMENTALS_FILE);
        if !path.is_file() {
            return Err(Error::Provider(format!(
                "no {} in {}",
                FUNDAMENTALS_FILE,
                self.data_dir.display()
            )));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        for row in reader.deserialize() {
            let record: Fundamentals = row?;
            if record.ticker.trim().eq_ignore_ascii_case(ticker) {
                return Ok(Fundamentals {
                    ticker: ticker.to_string(),
                    ..record
                });
            }
        }

        Err(Error::Provider(format!("no fundamentals for {}", ticker)))
    }
}
