//! Chronological train/test partitioning.

use crate::error::{ForecastError, Result};
use crate::schema::FeatureMatrix;
use chrono::{Datelike, NaiveDate};
use tracing::info;

/// Contiguous (train, test) partitions; every test date follows every train date.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

/// Linear-interpolated quantile of sorted dates, in days since the CE epoch.
fn date_quantile(dates: &[NaiveDate], q: f64) -> f64 {
    let idx = q * (dates.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let frac = idx - lower as f64;
    let day = |i: usize| dates[i].num_days_from_ce() as f64;
    day(lower) * (1.0 - frac) + day(upper) * frac
}

/// Split at the `(1 - test_ratio)` date quantile.
///
/// Rows dated on or before the split date form the training partition, the
/// remainder the test partition. No shuffling takes place.
pub fn chronological_split(matrix: &FeatureMatrix, test_ratio: f64) -> Result<Split> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ForecastError::invalid_parameter(
            "test_ratio",
            test_ratio,
            "must be in (0, 1)",
        ));
    }
    if matrix.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: matrix.len(),
        });
    }

    let split_day = date_quantile(matrix.dates(), 1.0 - test_ratio);
    let n_train = matrix
        .dates()
        .iter()
        .take_while(|d| d.num_days_from_ce() as f64 <= split_day)
        .count();

    if n_train == 0 || n_train == matrix.len() {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: n_train.min(matrix.len() - n_train),
        });
    }

    let train = matrix.slice(0..n_train)?;
    let test = matrix.slice(n_train..matrix.len())?;
    info!(train = train.len(), test = test.len(), "chronological split");

    Ok(Split { train, test })
}
