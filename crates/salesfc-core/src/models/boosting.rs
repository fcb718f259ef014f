//! Gradient boosted regression trees over the engineered features.
//!
//! Squared loss: every round fits a [`RegressionTree`] to the current
//! residuals of a row subsample, restricted to a per-tree column subsample,
//! and adds the shrunken tree output to the predictions of every row.
//! Features are standardised with statistics from the training partition.

use super::scaler::StandardScaler;
use super::tree::{RegressionTree, TreeParams};
use super::{Horizon, ModelAdapter, PredictionSet, TrainedModel};
use crate::config::BoostingConfig;
use crate::error::{ForecastError, Result};
use crate::schema::FeatureMatrix;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

pub const MODEL_NAME: &str = "GradientBoosting";

/// Gradient Boosting Regressor
#[derive(Debug, Clone)]
pub struct GradientBoostingRegressor {
    config: BoostingConfig,
    trees: Vec<RegressionTree>,
    initial_prediction: f64,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
        }
    }

    /// Fit on column-major features; `columns[j][i]` is feature `j` of row `i`.
    pub fn fit(&mut self, columns: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_samples = y.len();
        let n_features = columns.len();
        if n_samples == 0 {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        if n_features == 0 {
            return Err(ForecastError::InvalidInput(
                "gradient boosting needs at least one feature column".to_string(),
            ));
        }
        if let Some(bad) = columns.iter().position(|c| c.len() != n_samples) {
            return Err(ForecastError::InvalidInput(format!(
                "feature column {} has {} rows, target has {}",
                bad,
                columns[bad].len(),
                n_samples
            )));
        }

        self.n_features = n_features;
        self.trees.clear();
        self.initial_prediction = y.iter().sum::<f64>() / n_samples as f64;

        let mut predictions = vec![self.initial_prediction; n_samples];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
            reg_lambda: self.config.reg_lambda,
        };

        for _ in 0..self.config.n_estimators {
            let residuals: Vec<f64> = y
                .iter()
                .zip(&predictions)
                .map(|(yi, pi)| yi - pi)
                .collect();

            let rows = sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let tree = RegressionTree::fit(columns, &residuals, &rows, &cols, params);
            for (i, p) in predictions.iter_mut().enumerate() {
                *p += self.config.learning_rate * tree.predict_row(columns, i);
            }
            self.trees.push(tree);
        }

        debug!(
            trees = self.trees.len(),
            rows = n_samples,
            features = n_features,
            "gradient boosting fitted"
        );
        Ok(())
    }

    pub fn predict(&self, columns: &[Vec<f64>]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(ForecastError::NotFitted(MODEL_NAME.to_string()));
        }
        if columns.len() != self.n_features {
            return Err(ForecastError::InvalidInput(format!(
                "model fitted on {} features, got {}",
                self.n_features,
                columns.len()
            )));
        }
        let n = columns.first().map_or(0, |c| c.len());
        Ok((0..n)
            .map(|i| {
                self.initial_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict_row(columns, i))
                        .sum::<f64>()
            })
            .collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Sorted sample of `ceil(n * ratio)` distinct indices (at least one).
fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let sample_size = (((n as f64) * ratio).ceil() as usize).clamp(1, n);
    let mut indices: Vec<usize> = (0..n).collect();
    if sample_size < n {
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
    }
    indices
}

/// Adapter that scales every feature column and boosts trees on them.
#[derive(Debug, Clone, Default)]
pub struct GradientBoostingAdapter {
    config: BoostingConfig,
}

impl GradientBoostingAdapter {
    pub fn new(config: BoostingConfig) -> Self {
        Self { config }
    }
}

impl ModelAdapter for GradientBoostingAdapter {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn supports_future_horizon(&self) -> bool {
        false
    }

    fn train(&self, train: &FeatureMatrix) -> Result<Box<dyn TrainedModel>> {
        let feature_names: Vec<String> =
            train.feature_names().into_iter().map(String::from).collect();
        if feature_names.is_empty() {
            return Err(ForecastError::InvalidInput(
                "gradient boosting needs at least one feature column".to_string(),
            ));
        }

        let raw: Vec<&[f64]> = (0..train.n_features()).map(|j| train.column_at(j)).collect();
        let scaler = StandardScaler::fit(&raw)?;
        let scaled = scaler.transform(&raw)?;

        let mut regressor = GradientBoostingRegressor::new(self.config.clone());
        regressor.fit(&scaled, train.values())?;

        Ok(Box::new(TrainedGradientBoosting {
            feature_names,
            scaler,
            regressor,
        }))
    }
}

struct TrainedGradientBoosting {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    regressor: GradientBoostingRegressor,
}

impl TrainedModel for TrainedGradientBoosting {
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

        // Columns are matched by name, not position.
        let raw = self
            .feature_names
            .iter()
            .map(|name| {
                matrix
                    .column(name)
                    .ok_or_else(|| ForecastError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<&[f64]>>>()?;
        let scaled = self.scaler.transform(&raw)?;
        let point = self.regressor.predict(&scaled)?;

        PredictionSet::new(matrix.dates().to_vec(), point)
    }
}
