use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;

/// Ordered `(date, value)` points, ascending by date with no repeated dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    points: Vec<(NaiveDate, f64)>,
}

/// Per-ticker return series keyed by ticker, in input order.
pub type ReturnCollection = IndexMap<String, TimeSeries>;

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from arbitrary points. Points are sorted by date and a
    /// repeated date keeps the value that came last.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut points: Vec<(NaiveDate, f64)> = points.into_iter().collect();
        // stable, so equal dates stay in arrival order
        points.sort_by_key(|(d, _)| *d);

        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(points.len());
        for (date, value) in points {
            match deduped.last_mut() {
                Some(last) if last.0 == date => last.1 = value,
                _ => deduped.push((date, value)),
            }
        }

        Self { points: deduped }
    }

    /// Like `from_points`, but every date is first moved to the first day of
    /// its month. The last observation of a month wins.
    pub fn monthly<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::from_points(points.into_iter().map(|(d, v)| (month_start(d), v)))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Value at `date`, if the series has one.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.0, last.0)),
            _ => None,
        }
    }
}

impl FromIterator<(NaiveDate, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_from_points_sorts_and_dedups() {
        let series = TimeSeries::from_points(vec![
            (d(2024, 3, 1), 3.0),
            (d(2024, 1, 1), 1.0),
            (d(2024, 3, 1), 30.0),
            (d(2024, 2, 1), 2.0),
        ]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), vec![1.0, 2.0, 30.0]);
        assert_eq!(series.date_range(), Some((d(2024, 1, 1), d(2024, 3, 1))));
    }

    #[test]
    fn test_monthly_snaps_to_month_start() {
        let series = TimeSeries::monthly(vec![
            (d(2024, 1, 15), 10.0),
            (d(2024, 1, 31), 11.0),
            (d(2024, 2, 29), 12.0),
        ]);
        let dates: Vec<_> = series.dates().collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 2, 1)]);
        assert_eq!(series.get(d(2024, 1, 1)), Some(11.0));
    }

    #[test]
    fn test_get_missing_date() {
        let series: TimeSeries = vec![(d(2024, 1, 1), 1.0)].into_iter().collect();
        assert_eq!(series.get(d(2024, 2, 1)), None);
        assert!(TimeSeries::new().date_range().is_none());
    }
}
