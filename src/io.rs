use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::{fundamentals_frame, portfolio_frame, prices_frame, returns_frame};
use crate::views::{IndividualView, PortfolioView};
use crate::Result;

/// Save DataFrame to CSV file
pub fn save_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df.clone())?;

    Ok(())
}

/// Save `df` unless the file exists and `force` is not set
pub fn export_dataframe<P: AsRef<Path>>(df: &DataFrame, path: P, force: bool) -> Result<()> {
    let path = path.as_ref();

    if path.exists() && !force {
        return Err(crate::Error::Other(format!(
            "Output file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    save_csv(df, path)?;
    info!(path = %path.display(), rows = df.height(), "exported table");
    Ok(())
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(crate::Error::Other(format!(
            "Output path is not a directory: {}",
            dir.display()
        )));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Write `prices.csv` and `fundamentals.csv` for the individual view
pub fn export_individual_view<P: AsRef<Path>>(
    view: &IndividualView,
    dir: P,
    force: bool,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    prepare_output_dir(dir)?;
    let mut written = Vec::new();

    if !view.prices.is_empty() {
        let path = dir.join("prices.csv");
        export_dataframe(&prices_frame(&view.prices)?, &path, force)?;
        written.push(path);
    }

    if !view.fundamentals.is_empty() {
        let path = dir.join("fundamentals.csv");
        export_dataframe(&fundamentals_frame(&view.fundamentals)?, &path, force)?;
        written.push(path);
    }

    Ok(written)
}

/// Write `returns.csv` and, when a portfolio was computed, `portfolio.csv`
pub fn export_portfolio_view<P: AsRef<Path>>(
    view: &PortfolioView,
    dir: P,
    force: bool,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    prepare_output_dir(dir)?;
    let mut written = Vec::new();

    if !view.returns.is_empty() {
        let path = dir.join("returns.csv");
        export_dataframe(&returns_frame(&view.returns)?, &path, force)?;
        written.push(path);
    }

    if let Some(section) = &view.portfolio {
        let path = dir.join("portfolio.csv");
        export_dataframe(&portfolio_frame(&section.result)?, &path, force)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeries;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn sample_view() -> IndividualView {
        let mut prices = IndexMap::new();
        prices.insert(
            "SPY".to_string(),
            TimeSeries::from_points(vec![
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 470.0),
                (NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 495.5),
            ]),
        );
        IndividualView {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            prices,
            fundamentals: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_export_individual_view_writes_prices() {
        let dir = TempDir::new().unwrap();
        let written = export_individual_view(&sample_view(), dir.path(), false).unwrap();
        assert_eq!(written, vec![dir.path().join("prices.csv")]);

        let content = fs::read_to_string(dir.path().join("prices.csv")).unwrap();
        assert!(content.starts_with("Date,SPY"));
        assert!(content.contains("2024-02-01,495.5"));
    }

    #[test]
    fn test_export_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        export_individual_view(&sample_view(), dir.path(), false).unwrap();
        assert!(export_individual_view(&sample_view(), dir.path(), false).is_err());
        assert!(export_individual_view(&sample_view(), dir.path(), true).is_ok());
    }

    #[test]
    fn test_export_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("run");
        export_individual_view(&sample_view(), &nested, false).unwrap();
        assert!(nested.join("prices.csv").exists());
    }
}
