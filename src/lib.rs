pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod io;
pub mod portfolio;
pub mod provider;
pub mod report;
pub mod series;
pub mod ticker;
pub mod views;

pub use error::{Error, InputError, Result};
pub use portfolio::{calculate_equal_weighted_returns, PortfolioReturns};
pub use series::{ReturnCollection, TimeSeries};
pub use ticker::clean_ticker_input;
