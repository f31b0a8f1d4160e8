use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::debug;

use crate::provider::ProviderConfig;
use crate::Result;

const LOCAL_CONFIG_FILE: &str = ".stock_screener.toml";

/// Defaults for the CLI options, read from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default comma-separated tickers
    pub tickers: Option<String>,

    /// Default start date
    pub start_date: Option<NaiveDate>,

    /// Default end date
    pub end_date: Option<NaiveDate>,

    /// Default local data directory
    pub data_dir: Option<String>,

    /// Default export directory
    pub output: Option<String>,

    /// Force overwrite without prompting
    pub force: Option<bool>,

    /// Fetch tickers concurrently
    pub concurrent: Option<bool>,

    /// Verbose mode
    pub verbose: Option<bool>,

    /// Market data provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Candidate config files, most specific first:
    /// `./.stock_screener.toml`, `$XDG_CONFIG_HOME/stock_screener/config.toml`
    /// (or `~/.config/...`), then `~/.stock_screener.toml`
    pub fn search_paths() -> Vec<PathBuf> {
        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        let xdg = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".config")));

        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        paths.extend(xdg.map(|dir| dir.join("stock_screener").join("config.toml")));
        paths.extend(home.map(|dir| dir.join(LOCAL_CONFIG_FILE)));
        paths
    }

    /// First config file found in `search_paths`, if any
    pub fn load_default() -> Result<Option<Self>> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                Self::from_file(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Explicit path if given, otherwise the default lookup
    pub fn load(path: Option<&Path>) -> Result<Option<Self>> {
        match path {
            Some(path) => Ok(Some(Self::from_file(path)?)),
            None => Self::load_default(),
        }
    }

    /// Fill unset CLI options from the config; anything given on the command line wins
    pub fn merge_with_cli(&self, cli_args: &mut crate::cli::Args) {
        if cli_args.tickers.is_none() {
            cli_args.tickers = self.tickers.clone();
        }

        if cli_args.start.is_none() {
            cli_args.start = self.start_date;
        }

        if cli_args.end.is_none() {
            cli_args.end = self.end_date;
        }

        if cli_args.data_dir.is_none() {
            cli_args.data_dir = self.data_dir.clone();
        }

        if cli_args.output.is_none() {
            cli_args.output = self.output.clone();
        }

        // a flag can only be switched on by the config
        if !cli_args.force && self.force == Some(true) {
            cli_args.force = true;
        }

        if !cli_args.concurrent && self.concurrent == Some(true) {
            cli_args.concurrent = true;
        }

        if !cli_args.verbose && self.verbose == Some(true) {
            cli_args.verbose = true;
        }
    }
}
