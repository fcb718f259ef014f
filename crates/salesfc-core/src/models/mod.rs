//! Model adapters.
//!
//! Every algorithm family sits behind [`ModelAdapter`] (training) and
//! [`TrainedModel`] (prediction), so the pipeline can iterate adapters
//! uniformly. Adapters only ever see the training partition by shared
//! reference; nothing they return borrows from it.

pub mod arima;
pub mod boosting;
pub mod scaler;
pub mod seasonal;
pub mod tree;

pub use arima::ArimaAdapter;
pub use boosting::{GradientBoostingAdapter, GradientBoostingRegressor};
pub use seasonal::SeasonalTrendAdapter;

use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use crate::schema::FeatureMatrix;
use chrono::NaiveDate;

/// What a trained model is asked to predict.
#[derive(Debug, Clone, Copy)]
pub enum Horizon<'a> {
    /// Rows of a held-out partition, predicted index-for-index.
    Partition(&'a FeatureMatrix),
    /// Dates beyond the observed range; only calendar-aware models accept this.
    Future(&'a [NaiveDate]),
}

impl<'a> Horizon<'a> {
    pub fn dates(&self) -> &'a [NaiveDate] {
        match *self {
            Horizon::Partition(m) => m.dates(),
            Horizon::Future(d) => d,
        }
    }

    pub fn len(&self) -> usize {
        self.dates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }
}

/// Predicted values aligned index-for-index with the requested dates.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSet {
    pub dates: Vec<NaiveDate>,
    pub point: Vec<f64>,
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
}

impl PredictionSet {
    pub fn new(dates: Vec<NaiveDate>, point: Vec<f64>) -> Result<Self> {
        if dates.len() != point.len() {
            return Err(ForecastError::ComputationError(format!(
                "prediction has {} values for {} dates",
                point.len(),
                dates.len()
            )));
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(
                "prediction contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            dates,
            point,
            lower: None,
            upper: None,
        })
    }

    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != self.point.len() || upper.len() != self.point.len() {
            return Err(ForecastError::ComputationError(
                "prediction bounds are not aligned with point forecasts".to_string(),
            ));
        }
        self.lower = Some(lower);
        self.upper = Some(upper);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Clip point forecasts and bounds at zero.
    pub fn clip_non_negative(mut self) -> Self {
        let clip = |v: &mut Vec<f64>| v.iter_mut().for_each(|x| *x = x.max(0.0));
        clip(&mut self.point);
        if let Some(lower) = self.lower.as_mut() {
            clip(lower);
        }
        if let Some(upper) = self.upper.as_mut() {
            clip(upper);
        }
        self
    }
}

/// Training half of the adapter contract.
pub trait ModelAdapter: Send + Sync {
    /// Model name used in evaluation tables and output column names.
    fn name(&self) -> &str;

    /// Whether trained models accept [`Horizon::Future`].
    fn supports_future_horizon(&self) -> bool;

    fn train(&self, train: &FeatureMatrix) -> Result<Box<dyn TrainedModel>>;
}

/// Fitted state of one adapter; owns everything it needs to predict.
pub trait TrainedModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, horizon: &Horizon<'_>) -> Result<PredictionSet>;
}

/// The three standard adapters in reference order.
pub fn default_adapters(config: &ModelConfig) -> Vec<Box<dyn ModelAdapter>> {
    vec![
        Box::new(SeasonalTrendAdapter::new(config.seasonal.clone())),
        Box::new(ArimaAdapter::new(config.arima)),
        Box::new(GradientBoostingAdapter::new(config.boosting.clone())),
    ]
}
