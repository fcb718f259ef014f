//! Univariate ARIMA baseline backed by `anofox-forecast`.
//!
//! The model sees only the target values of the training partition. A test
//! partition is predicted by forecasting forward from the last training date
//! to the last requested date and taking the steps that match the requested
//! dates, assuming daily frequency.

use super::{Horizon, ModelAdapter, PredictionSet, TrainedModel};
use crate::config::ArimaConfig;
use crate::error::{ForecastError, Result};
use crate::schema::FeatureMatrix;
use anofox_forecast::core::TimeSeriesBuilder;
use anofox_forecast::models::arima::ARIMA;
use anofox_forecast::prelude::Forecaster;
use chrono::NaiveDate;
use std::sync::Mutex;
use tracing::debug;

pub const MODEL_NAME: &str = "ARIMA";

#[derive(Debug, Clone, Copy, Default)]
pub struct ArimaAdapter {
    config: ArimaConfig,
}

impl ArimaAdapter {
    pub fn new(config: ArimaConfig) -> Self {
        Self { config }
    }
}

impl ModelAdapter for ArimaAdapter {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn supports_future_horizon(&self) -> bool {
        false
    }

    fn train(&self, train: &FeatureMatrix) -> Result<Box<dyn TrainedModel>> {
        let ArimaConfig { p, d, q } = self.config;
        let needed = p + d + q + 1;
        if train.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: train.len(),
            });
        }
        let Some(last_train_date) = train.last_date() else {
            return Err(ForecastError::InsufficientData { needed, got: 0 });
        };

        let time_series = TimeSeriesBuilder::new()
            .values(train.values().to_vec())
            .build()
            .map_err(|e| {
                ForecastError::ComputationError(format!("Failed to build TimeSeries: {}", e))
            })?;

        let mut model = ARIMA::new(p, d, q);
        model.fit(&time_series).map_err(|e| {
            ForecastError::ComputationError(format!("Failed to fit ARIMA model: {}", e))
        })?;

        debug!(p, d, q, rows = train.len(), "ARIMA fitted");

        Ok(Box::new(TrainedArima {
            model: Mutex::new(model),
            last_train_date,
        }))
    }
}

struct TrainedArima {
    model: Mutex<ARIMA>,
    last_train_date: NaiveDate,
}

impl TrainedArima {
    /// 1-based step offsets of `dates` from the end of training.
    fn steps(&self, dates: &[NaiveDate]) -> Result<Vec<usize>> {
        dates
            .iter()
            .map(|d| {
                let offset = (*d - self.last_train_date).num_days();
                if offset < 1 {
                    return Err(ForecastError::InvalidInput(format!(
                        "ARIMA can only predict dates after {}, got {}",
                        self.last_train_date, d
                    )));
                }
                Ok(offset as usize)
            })
            .collect()
    }
}

impl TrainedModel for TrainedArima {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn predict(&self, horizon: &Horizon<'_>) -> Result<PredictionSet> {
        let matrix = match horizon {
            Horizon::Partition(m) => *m,
            Horizon::Future(_) => {
                return Err(ForecastError::UnsupportedHorizon(MODEL_NAME.to_string()))
            }
        };
        let steps = self.steps(matrix.dates())?;
        let Some(&max_step) = steps.iter().max() else {
            return PredictionSet::new(Vec::new(), Vec::new());
        };

        let forecast = self
            .model
            .lock()
            .map_err(|_| ForecastError::ComputationError("ARIMA model lock poisoned".into()))?
            .predict(max_step)
            .map_err(|e| {
                ForecastError::ComputationError(format!(
                    "Failed to generate ARIMA forecasts: {}",
                    e
                ))
            })?;
        let path = forecast.point().first().cloned().unwrap_or_default();
        if path.len() < max_step {
            return Err(ForecastError::ComputationError(format!(
                "ARIMA returned {} steps, expected {}",
                path.len(),
                max_step
            )));
        }

        let point = steps.iter().map(|s| path[s - 1]).collect();
        Ok(PredictionSet::new(matrix.dates().to_vec(), point)?.clip_non_negative())
    }
}
