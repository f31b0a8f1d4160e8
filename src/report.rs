use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite;

use chrono::NaiveDate;
use indexmap::IndexMap;
use polars::prelude::*;

use crate::portfolio::PortfolioReturns;
use crate::provider::Fundamentals;
use crate::series::TimeSeries;
use crate::views::{Distribution, IndividualView, PortfolioView, Warning};
use crate::Result;

const HISTOGRAM_WIDTH: usize = 40;

/// One row per date in any series (outer join), one column per ticker.
fn wide_frame(series: &IndexMap<String, TimeSeries>) -> Result<DataFrame> {
    let dates: BTreeSet<NaiveDate> = series.values().flat_map(|s| s.dates()).collect();

    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push(Column::new(
        "Date".into(),
        dates.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
    ));

    for (ticker, s) in series {
        let values: Vec<Option<f64>> = dates.iter().map(|d| s.get(*d)).collect();
        columns.push(Column::new(ticker.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Adjusted-close prices, one column per ticker
pub fn prices_frame(prices: &IndexMap<String, TimeSeries>) -> Result<DataFrame> {
    wide_frame(prices)
}

/// Monthly returns, one column per ticker
pub fn returns_frame(returns: &IndexMap<String, TimeSeries>) -> Result<DataFrame> {
    wide_frame(returns)
}

/// Portfolio monthly and cumulative returns on the aligned dates
pub fn portfolio_frame(result: &PortfolioReturns) -> Result<DataFrame> {
    let dates: Vec<String> = result.returns.dates().map(|d| d.to_string()).collect();

    let df = DataFrame::new(vec![
        Column::new("Date".into(), dates),
        Column::new("Portfolio Return".into(), result.returns.values()),
        Column::new("Cumulative Return".into(), result.cumulative.values()),
    ])?;

    Ok(df)
}

/// Fundamentals table with one row per ticker
pub fn fundamentals_frame(records: &[Fundamentals]) -> Result<DataFrame> {
    let text = |f: fn(&Fundamentals) -> Option<String>| -> Vec<Option<String>> {
        records.iter().map(f).collect()
    };
    let number = |f: fn(&Fundamentals) -> Option<f64>| -> Vec<Option<f64>> {
        records.iter().map(f).collect()
    };

    let df = DataFrame::new(vec![
        Column::new(
            "Ticker".into(),
            records.iter().map(|r| r.ticker.clone()).collect::<Vec<_>>(),
        ),
        Column::new("Company Name".into(), text(|r| r.company_name.clone())),
        Column::new("Sector".into(), text(|r| r.sector.clone())),
        Column::new("Market Cap".into(), number(|r| r.market_cap)),
        Column::new("Trailing PE".into(), number(|r| r.trailing_pe)),
        Column::new("Forward PE".into(), number(|r| r.forward_pe)),
        Column::new("EPS (TTM)".into(), number(|r| r.trailing_eps)),
        Column::new("Dividend Yield".into(), number(|r| r.dividend_yield)),
        Column::new("52-Week High".into(), number(|r| r.fifty_two_week_high)),
        Column::new("52-Week Low".into(), number(|r| r.fifty_two_week_low)),
        Column::new("Price-to-Book".into(), number(|r| r.price_to_book)),
        Column::new("Beta".into(), number(|r| r.beta)),
    ])?;

    Ok(df)
}

fn write_header(out: &mut String, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.len()))?;
    Ok(())
}

fn write_warnings(out: &mut String, warnings: &[Warning]) -> Result<()> {
    for warning in warnings {
        writeln!(out, "Warning: {}", warning)?;
    }
    Ok(())
}

/// Text histogram for one distribution
pub fn format_distribution(distribution: &Distribution) -> Result<String> {
    let mut output = String::new();
    let stats = &distribution.stats;

    writeln!(
        output,
        "{} (n={}, mean={:.4}, std={:.4}, min={:.4}, max={:.4})",
        distribution.label, stats.count, stats.mean, stats.std_dev, stats.min, stats.max
    )?;

    let peak = distribution.bins.iter().map(|b| b.count).max().unwrap_or(0);
    for bin in &distribution.bins {
        let width = if peak > 0 {
            (bin.count * HISTOGRAM_WIDTH).div_ceil(peak)
        } else {
            0
        };
        writeln!(
            output,
            "  [{:>8.4}, {:>8.4}) {:>4} {}",
            bin.lower,
            bin.upper,
            bin.count,
            "#".repeat(width)
        )?;
    }

    Ok(output)
}

/// Render the individual view: price table, fundamentals table and warnings
pub fn render_individual_view(view: &IndividualView) -> Result<String> {
    let mut report = String::new();

    writeln!(report, "{}", "=".repeat(60))?;
    writeln!(report, "STOCK SCREENER - INDIVIDUAL VIEW")?;
    writeln!(report, "{}", "=".repeat(60))?;
    write_warnings(&mut report, &view.warnings)?;

    if !view.prices.is_empty() {
        write_header(
            &mut report,
            &format!("Stock Prices from {} to {}", view.start, view.end),
        )?;
        writeln!(report, "{}", prices_frame(&view.prices)?)?;
    }

    if !view.fundamentals.is_empty() {
        write_header(&mut report, "Fundamentals Summary")?;
        writeln!(report, "{}", fundamentals_frame(&view.fundamentals)?)?;
    }

    Ok(report)
}

/// Render the portfolio view: distributions, then the portfolio series
pub fn render_portfolio_view(view: &PortfolioView) -> Result<String> {
    let mut report = String::new();

    writeln!(report, "{}", "=".repeat(60))?;
    writeln!(report, "STOCK SCREENER - PORTFOLIO VIEW")?;
    writeln!(report, "{}", "=".repeat(60))?;
    write_warnings(&mut report, &view.warnings)?;

    if view.distributions.is_empty() {
        return Ok(report);
    }

    write_header(&mut report, "Individual Return Distribution(s)")?;
    writeln!(report, "Bin size: {:.4}", view.bin_size)?;
    for distribution in &view.distributions {
        writeln!(report, "{}", format_distribution(distribution)?)?;
    }

    if let Some(section) = &view.portfolio {
        write_header(&mut report, "Portfolio Return Distribution")?;
        writeln!(report, "{}", format_distribution(&section.distribution)?)?;

        write_header(&mut report, "Equal-Weighted Portfolio Return")?;
        writeln!(report, "{}", section.result.portfolio.summary())?;
        writeln!(report, "{}", portfolio_frame(&section.result)?)?;
    }

    Ok(report)
}
