//! Accuracy of test-partition predictions.

use crate::config::PerformanceThresholds;
use crate::error::{ForecastError, Result};
use crate::metrics;
use crate::models::PredictionSet;
use crate::schema::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// One row of the model comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    /// Fraction, `None` when an actual value is zero.
    #[serde(rename = "MAPE")]
    pub mape: Option<f64>,
    #[serde(rename = "R2")]
    pub r2: f64,
}

/// Score `prediction` against the target values of `test`.
///
/// The prediction must cover the same dates in the same order.
pub fn evaluate(
    model: &str,
    test: &FeatureMatrix,
    prediction: &PredictionSet,
) -> Result<EvaluationRow> {
    if test.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if prediction.dates.as_slice() != test.dates() {
        return Err(ForecastError::InvalidInput(format!(
            "predictions of {} are not aligned with the test partition ({} vs {} rows)",
            model,
            prediction.len(),
            test.len()
        )));
    }

    let actual = test.values();
    let forecast = &prediction.point;
    Ok(EvaluationRow {
        model: model.to_string(),
        mae: metrics::mae(actual, forecast)?,
        rmse: metrics::rmse(actual, forecast)?,
        mape: metrics::mape(actual, forecast)?,
        r2: metrics::r2(actual, forecast)?,
    })
}

/// Whether an evaluation row meets the configured targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub model: String,
    pub meets_r2: bool,
    /// `None` when MAPE is undefined for the test partition.
    pub meets_mape: Option<bool>,
    /// RMSE divided by the mean actual value.
    pub rmse_fraction: f64,
    pub meets_rmse: bool,
}

impl ThresholdReport {
    /// All defined checks pass.
    pub fn passed(&self) -> bool {
        self.meets_r2 && self.meets_mape.unwrap_or(true) && self.meets_rmse
    }
}

impl PerformanceThresholds {
    pub fn assess(&self, row: &EvaluationRow, actual_mean: f64) -> ThresholdReport {
        let rmse_fraction = if actual_mean.abs() > f64::EPSILON {
            row.rmse / actual_mean.abs()
        } else {
            f64::INFINITY
        };
        ThresholdReport {
            model: row.model.clone(),
            meets_r2: row.r2 >= self.min_r2,
            meets_mape: row.mape.map(|m| m <= self.max_mape),
            rmse_fraction,
            meets_rmse: rmse_fraction <= self.target_rmse_percent,
        }
    }
}
