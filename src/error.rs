use chrono::NaiveDate;
use thiserror::Error;

/// Input problems that stop an action before anything is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please enter at least one ticker symbol")]
    EmptyTickers,

    #[error("Duplicate Tickers Used: {}", .0.join(", "))]
    DuplicateTickers(Vec<String>),

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
