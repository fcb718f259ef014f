//! Daily sales series.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;

/// One observation of the target series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A chronologically ordered series with strictly increasing dates.
///
/// Gaps are not filled here; callers are expected to hand over a
/// gap-free daily series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from points that are already in chronological order.
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        for (i, w) in points.windows(2).enumerate() {
            if w[1].date <= w[0].date {
                return Err(ForecastError::InvalidInput(format!(
                    "dates must be strictly increasing: {} at row {} follows {}",
                    w[1].date,
                    i + 1,
                    w[0].date
                )));
            }
        }
        if let Some(p) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "non-finite value {} on {}",
                p.value, p.date
            )));
        }

        let (dates, values) = points.into_iter().map(|p| (p.date, p.value)).unzip();
        Ok(Self { dates, values })
    }

    /// Sort points by date first, then validate as in [`TimeSeries::new`].
    pub fn from_unsorted(mut points: Vec<TimeSeriesPoint>) -> Result<Self> {
        points.sort_by_key(|p| p.date);
        Self::new(points)
    }

    /// Build a series from parallel date and value vectors.
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInput(format!(
                "dates and values must have the same length: {} vs {}",
                dates.len(),
                values.len()
            )));
        }
        Self::new(
            dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| TimeSeriesPoint { date, value })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }

    pub fn points(&self) -> impl Iterator<Item = TimeSeriesPoint> + '_ {
        self.dates
            .iter()
            .zip(self.values.iter())
            .map(|(&date, &value)| TimeSeriesPoint { date, value })
    }
}
