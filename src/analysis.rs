use polars::prelude::*;

use crate::series::TimeSeries;
use crate::Result;

/// Period-over-period percentage returns for a price series.
///
/// The first period has no prior price and is dropped, as is any period whose
/// prior price is zero.
pub fn calculate_returns(prices: &TimeSeries) -> TimeSeries {
    let points: Vec<_> = prices.iter().collect();

    points
        .windows(2)
        .filter_map(|pair| {
            let (_, prev) = pair[0];
            let (date, curr) = pair[1];
            if prev != 0.0 {
                Some((date, (curr - prev) / prev))
            } else {
                None
            }
        })
        .collect()
}

/// Summary of a return distribution
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Calculate count, mean, sample standard deviation and range of `values`
pub fn distribution_stats(values: &[f64]) -> Result<DistributionStats> {
    let series = Series::new("returns".into(), values);
    let returns = series.f64()?;

    Ok(DistributionStats {
        count: values.len(),
        mean: returns.mean().unwrap_or(0.0),
        std_dev: returns.std(1).unwrap_or(0.0), // ddof=1 for sample std dev
        min: returns.min().unwrap_or(0.0),
        max: returns.max().unwrap_or(0.0),
    })
}

/// Histogram bin width shared by all distributions drawn together
pub fn distribution_bin_size(n_distributions: usize) -> f64 {
    if n_distributions == 0 {
        return 0.03;
    }
    (0.03 / n_distributions as f64).max(0.005)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Most bins a single histogram may have
pub const MAX_HISTOGRAM_BINS: usize = 200;

/// Fixed-width histogram with bin edges on multiples of `bin_size`.
///
/// When the values span more than `MAX_HISTOGRAM_BINS` bins, the range is
/// split into exactly that many wider bins instead.
pub fn histogram(values: &[f64], bin_size: f64) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bin_size <= 0.0 || !bin_size.is_finite() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut start = (min / bin_size).floor() * bin_size;
    let mut width = bin_size;
    // float to int casts saturate, so a huge span cannot wrap here
    let mut n_bins = (((max - start) / width).floor() as usize).saturating_add(1);

    if n_bins > MAX_HISTOGRAM_BINS || !start.is_finite() {
        start = min;
        width = (max - min) / MAX_HISTOGRAM_BINS as f64;
        n_bins = MAX_HISTOGRAM_BINS;
    }

    // span too wide for f64
    if !width.is_finite() {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: finite.len(),
        }];
    }

    let mut counts = vec![0usize; n_bins];
    for v in finite {
        let idx = ((v - start) / width).floor() as usize;
        counts[idx.min(n_bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: start + i as f64 * width,
            upper: start + (i + 1) as f64 * width,
            count,
        })
        .collect()
}
