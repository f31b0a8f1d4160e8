use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_START_DATE: &str = "2020-01-01";
pub const DEFAULT_END_DATE: &str = "2024-12-31";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub view: View,

    /// Comma-separated ticker symbols (e.g. "aapl, msft, spy")
    #[arg(short = 't', long, global = true)]
    pub tickers: Option<String>,

    /// First date of the price history (YYYY-MM-DD) [default: 2020-01-01]
    #[arg(short = 's', long, global = true)]
    pub start: Option<NaiveDate>,

    /// End of the price history, exclusive (YYYY-MM-DD) [default: 2024-12-31]
    #[arg(short = 'e', long, global = true)]
    pub end: Option<NaiveDate>,

    /// Read prices from {TICKER}.csv files and fundamentals.csv in this
    /// directory instead of Yahoo Finance
    #[arg(short = 'd', long, global = true)]
    pub data_dir: Option<String>,

    /// Directory to export the view's tables to as CSV
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Force overwrite of existing output files
    #[arg(long, global = true)]
    pub force: bool,

    /// Fetch tickers concurrently
    #[arg(long, global = true)]
    pub concurrent: bool,

    /// Config file (defaults to .stock_screener.toml lookup)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Price history and fundamentals for each ticker
    Individual,
    /// Return distributions and the equal-weighted portfolio
    Portfolio,
}

impl Args {
    pub fn start_date(&self) -> NaiveDate {
        self.start.unwrap_or_else(|| default_date(DEFAULT_START_DATE))
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| default_date(DEFAULT_END_DATE))
    }
}

fn default_date(value: &str) -> NaiveDate {
    value.parse().unwrap_or(NaiveDate::MIN)
}

pub fn parse_args() -> Args {
    Args::parse()
}
