//! Additive trend plus Fourier seasonality regression.
//!
//! The target is regressed by OLS on a scaled linear time index and on
//! yearly and weekly Fourier pairs of the calendar date. Because every
//! regressor is a function of the date alone, the fitted model extrapolates
//! to any future calendar date.
//!
//! In multiplicative mode the regression runs on `ln(y)` and predictions are
//! exponentiated, so seasonal effects scale with the level.
//!
//! Prediction intervals assume Gaussian residuals whose spread grows with the
//! distance from the end of the training data:
//! `half_width = z * sigma * sqrt(1 + steps / n_train)`.

use super::{Horizon, ModelAdapter, PredictionSet, TrainedModel};
use crate::config::{SeasonalConfig, SeasonalityMode};
use crate::error::{ForecastError, Result};
use crate::schema::FeatureMatrix;
use anofox_regression::prelude::*;
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

pub const MODEL_NAME: &str = "SeasonalTrend";

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;

/// Yearly terms need two full cycles of history to be identifiable.
const MIN_YEARLY_SPAN_DAYS: i64 = 730;
/// Weekly terms need two full weeks.
const MIN_WEEKLY_SPAN_DAYS: i64 = 14;

#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendAdapter {
    config: SeasonalConfig,
}

impl SeasonalTrendAdapter {
    pub fn new(config: SeasonalConfig) -> Self {
        Self { config }
    }
}

/// Which regressors a fitted model uses and how the time index is scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DesignSpec {
    t0: NaiveDate,
    span_days: f64,
    yearly_order: usize,
    weekly_order: usize,
}

impl DesignSpec {
    fn n_regressors(&self) -> usize {
        1 + 2 * self.yearly_order + 2 * self.weekly_order
    }

    /// Column-major regressors for `dates`.
    fn columns(&self, dates: &[NaiveDate]) -> Vec<Vec<f64>> {
        let mut columns = Vec::with_capacity(self.n_regressors());
        columns.push(
            dates
                .iter()
                .map(|d| (*d - self.t0).num_days() as f64 / self.span_days)
                .collect(),
        );
        let epoch_days: Vec<f64> = dates.iter().map(|d| days_since_epoch(*d)).collect();
        append_fourier(&mut columns, &epoch_days, YEAR_DAYS, self.yearly_order);
        append_fourier(&mut columns, &epoch_days, WEEK_DAYS, self.weekly_order);
        columns
    }
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    (date - NaiveDate::default()).num_days() as f64
}

fn append_fourier(columns: &mut Vec<Vec<f64>>, days: &[f64], period: f64, order: usize) {
    for k in 1..=order {
        let w = 2.0 * PI * k as f64 / period;
        columns.push(days.iter().map(|t| (w * t).sin()).collect());
        columns.push(days.iter().map(|t| (w * t).cos()).collect());
    }
}

/// OLS with intercept; returns the intercept and one coefficient per column.
fn fit_ols(y: &[f64], x: &[Vec<f64>]) -> Result<(f64, Vec<f64>)> {
    let n = y.len();
    let k = x.len();

    let x_mat = faer::Mat::from_fn(n, k, |i, j| x[j][i]);
    let y_col = faer::Col::from_fn(n, |i| y[i]);

    let fitted = OlsRegressor::builder()
        .with_intercept(true)
        .build()
        .fit(&x_mat, &y_col)
        .map_err(|e| ForecastError::ComputationError(format!("OLS fit failed: {}", e)))?;

    let intercept = fitted.intercept().unwrap_or(0.0);
    let coeffs_col = fitted.coefficients();
    let coeffs: Vec<f64> = (0..coeffs_col.nrows()).map(|i| coeffs_col[i]).collect();
    if coeffs.len() != k || !intercept.is_finite() || coeffs.iter().any(|c| !c.is_finite()) {
        return Err(ForecastError::ComputationError(
            "OLS produced non-finite coefficients".to_string(),
        ));
    }
    Ok((intercept, coeffs))
}

fn apply(intercept: f64, coeffs: &[f64], columns: &[Vec<f64>], n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            intercept
                + coeffs
                    .iter()
                    .zip(columns)
                    .map(|(b, col)| b * col[i])
                    .sum::<f64>()
        })
        .collect()
}

/// Two-sided standard normal quantile for an interval of `width` coverage.
fn normal_quantile(width: f64) -> Result<f64> {
    if !(width > 0.0 && width < 1.0) {
        return Err(ForecastError::invalid_parameter(
            "interval_width",
            width,
            "must be in (0, 1)",
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ComputationError(format!("normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

impl ModelAdapter for SeasonalTrendAdapter {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn supports_future_horizon(&self) -> bool {
        true
    }

    fn train(&self, train: &FeatureMatrix) -> Result<Box<dyn TrainedModel>> {
        let (Some(first), Some(last)) = (train.first_date(), train.last_date()) else {
            return Err(ForecastError::InsufficientData { needed: 2, got: 0 });
        };
        let span = (last - first).num_days();

        let spec = DesignSpec {
            t0: first,
            span_days: span.max(1) as f64,
            yearly_order: if self.config.yearly_seasonality && span >= MIN_YEARLY_SPAN_DAYS {
                self.config.yearly_fourier_order
            } else {
                0
            },
            weekly_order: if self.config.weekly_seasonality && span >= MIN_WEEKLY_SPAN_DAYS {
                self.config.weekly_fourier_order
            } else {
                0
            },
        };

        let n = train.len();
        let k = spec.n_regressors();
        if n < k + 2 {
            return Err(ForecastError::InsufficientData {
                needed: k + 2,
                got: n,
            });
        }

        let y: Vec<f64> = match self.config.mode {
            SeasonalityMode::Additive => train.values().to_vec(),
            SeasonalityMode::Multiplicative => {
                if train.values().iter().any(|v| *v <= 0.0) {
                    return Err(ForecastError::InvalidInput(
                        "multiplicative seasonality requires strictly positive values".to_string(),
                    ));
                }
                train.values().iter().map(|v| v.ln()).collect()
            }
        };

        let columns = spec.columns(train.dates());
        let (intercept, coeffs) = fit_ols(&y, &columns)?;
        let fitted = apply(intercept, &coeffs, &columns, n);

        let ss_res: f64 = y.iter().zip(&fitted).map(|(a, f)| (a - f).powi(2)).sum();
        let dof = n.saturating_sub(k + 1).max(1);
        let sigma = (ss_res / dof as f64).sqrt();

        debug!(
            rows = n,
            regressors = k,
            yearly_order = spec.yearly_order,
            weekly_order = spec.weekly_order,
            sigma,
            "seasonal trend fitted"
        );

        Ok(Box::new(TrainedSeasonalTrend {
            spec,
            mode: self.config.mode,
            intercept,
            coeffs,
            sigma,
            z: normal_quantile(self.config.interval_width)?,
            n_train: n,
            last_train_date: last,
        }))
    }
}

struct TrainedSeasonalTrend {
    spec: DesignSpec,
    mode: SeasonalityMode,
    intercept: f64,
    coeffs: Vec<f64>,
    sigma: f64,
    z: f64,
    n_train: usize,
    last_train_date: NaiveDate,
}

impl TrainedModel for TrainedSeasonalTrend {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn predict(&self, horizon: &Horizon<'_>) -> Result<PredictionSet> {
        let dates = horizon.dates();
        let columns = self.spec.columns(dates);
        let center = apply(self.intercept, &self.coeffs, &columns, dates.len());

        let half_width: Vec<f64> = dates
            .iter()
            .map(|d| {
                let steps = (*d - self.last_train_date).num_days().max(0) as f64;
                self.z * self.sigma * (1.0 + steps / self.n_train as f64).sqrt()
            })
            .collect();

        let lower: Vec<f64> = center.iter().zip(&half_width).map(|(c, h)| c - h).collect();
        let upper: Vec<f64> = center.iter().zip(&half_width).map(|(c, h)| c + h).collect();

        let (point, lower, upper) = match self.mode {
            SeasonalityMode::Additive => (center, lower, upper),
            SeasonalityMode::Multiplicative => {
                let exp = |v: Vec<f64>| v.into_iter().map(f64::exp).collect::<Vec<_>>();
                (exp(center), exp(lower), exp(upper))
            }
        };

        PredictionSet::new(dates.to_vec(), point)?.with_bounds(lower, upper)
    }
}
