use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use reqwest::header::REFERER;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{Fundamentals, MarketDataProvider, ProviderConfig};
use crate::series::TimeSeries;
use crate::{Error, Result};

const COOKIE_URL: &str = "https://fc.yahoo.com";
const YAHOO_REFERER: &str = "https://finance.yahoo.com/";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,assetProfile";
const HALF_DAY_SECS: i64 = 12 * 60 * 60;

/// Yahoo Finance chart and quoteSummary endpoints over a blocking client.
///
/// quoteSummary needs a session cookie plus a crumb token; both are obtained
/// on first use and kept for the lifetime of the provider.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            crumb: Mutex::new(None),
        })
    }

    fn get(&self, url: &str) -> Result<(StatusCode, String)> {
        let response = self.client.get(url).header(REFERER, YAHOO_REFERER).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(%status, url, "yahoo response");
        Ok((status, body))
    }

    fn crumb(&self) -> Result<String> {
        let mut cached = self
            .crumb
            .lock()
            .map_err(|_| Error::Provider("yahoo crumb lock poisoned".to_string()))?;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the cookie set by this call matters; its status is usually 404.
        if let Err(err) = self.client.get(COOKIE_URL).header(REFERER, YAHOO_REFERER).send() {
            debug!(error = %err, "yahoo cookie request failed");
        }

        let (status, body) = self.get(&format!("{}/v1/test/getcrumb", self.base_url))?;
        let crumb = body.trim();
        if !status.is_success() || crumb.is_empty() || crumb.contains(' ') || crumb.contains('<') {
            return Err(Error::Provider(format!(
                "failed to obtain yahoo crumb (status {})",
                status
            )));
        }

        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    fn invalidate_crumb(&self) {
        if let Ok(mut cached) = self.crumb.lock() {
            *cached = None;
        }
    }

    fn quote_summary_url(&self, ticker: &str, crumb: &str) -> String {
        format!(
            "{}/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            self.base_url,
            urlencoding::encode(ticker),
            SUMMARY_MODULES,
            urlencoding::encode(crumb)
        )
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn monthly_prices(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1mo&includeAdjustedClose=true&events=div%2Csplits",
            self.base_url,
            urlencoding::encode(ticker),
            unix_seconds(start),
            unix_seconds(end)
        );

        let (status, body) = self.get(&url)?;
        if !status.is_success() {
            return Err(status_error(status, &body, "chart"));
        }

        parse_chart_response(&body)
    }

    fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let crumb = self.crumb()?;
        let (mut status, mut body) = self.get(&self.quote_summary_url(ticker, &crumb))?;

        // Expired crumb: refresh once and retry
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_crumb();
            let crumb = self.crumb()?;
            (status, body) = self.get(&self.quote_summary_url(ticker, &crumb))?;
        }

        if !status.is_success() {
            return Err(status_error(status, &body, "quoteSummary"));
        }

        parse_quote_summary(ticker, &body)
    }
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Prefer the API's own error description over the bare status code.
fn status_error(status: StatusCode, body: &str, root: &str) -> Error {
    let description = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get(root)?
                .get("error")?
                .get("description")?
                .as_str()
                .map(str::to_string)
        });

    match description {
        Some(description) => Error::Provider(description),
        None => Error::Provider(format!("yahoo returned status {}", status)),
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ApiError {
    fn into_error(self) -> Error {
        let message = match (self.code, self.description) {
            (_, Some(description)) => description,
            (Some(code), None) => code,
            (None, None) => "unknown yahoo error".to_string(),
        };
        Error::Provider(message)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Parse a v8 chart response into a monthly adjusted-close series.
///
/// Bars open at exchange-local midnight. Timestamps are shifted by the
/// exchange's GMT offset plus half a day before taking the date, which keeps a
/// bar in its own month even when `gmtoffset` reflects a different DST state.
/// Null closes are skipped.
pub fn parse_chart_response(body: &str) -> Result<TimeSeries> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        return Err(error.into_error());
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(TimeSeries::new());
    };

    let Some(timestamps) = result.timestamp else {
        return Ok(TimeSeries::new());
    };

    let closes = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .ok_or_else(|| Error::Provider("no adjusted close data in chart response".to_string()))?
        .adjclose;

    let offset = result.meta.map(|m| m.gmt_offset).unwrap_or(0);

    let points = timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = DateTime::from_timestamp(ts + offset + HALF_DAY_SECS, 0)?.date_naive();
            Some((date, close))
        });

    Ok(TimeSeries::monthly(points))
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
    #[serde(default)]
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    dividend_yield: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
    beta: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    trailing_eps: Option<RawValue>,
    price_to_book: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfileModule {
    sector: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`; `raw` is sometimes
/// a string such as `"Infinity"`, or the object is empty.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<serde_json::Value>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value
        .as_ref()?
        .raw
        .as_ref()?
        .as_f64()
        .filter(|v| v.is_finite())
}

/// Parse a quoteSummary response into a fundamentals record for `ticker`.
pub fn parse_quote_summary(ticker: &str, body: &str) -> Result<Fundamentals> {
    let response: QuoteSummaryResponse = serde_json::from_str(body)?;

    if let Some(error) = response.quote_summary.error {
        return Err(error.into_error());
    }

    let result = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| Error::Provider(format!("no fundamentals returned for {}", ticker)))?;

    let price = result.price.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let profile = result.asset_profile.unwrap_or_default();

    Ok(Fundamentals {
        ticker: ticker.to_string(),
        company_name: price.long_name,
        sector: profile.sector,
        market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
        trailing_pe: raw(&detail.trailing_pe),
        forward_pe: raw(&detail.forward_pe).or_else(|| raw(&stats.forward_pe)),
        trailing_eps: raw(&stats.trailing_eps),
        dividend_yield: raw(&detail.dividend_yield),
        fifty_two_week_high: raw(&detail.fifty_two_week_high),
        fifty_two_week_low: raw(&detail.fifty_two_week_low),
        price_to_book: raw(&stats.price_to_book),
        beta: raw(&detail.beta),
    })
}
