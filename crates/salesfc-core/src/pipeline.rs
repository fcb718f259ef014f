//! End-to-end orchestration.
//!
//! engineer features → chronological split → train and predict every adapter
//! → evaluate → forecast with the designated model → combine.
//!
//! A model that fails at any stage is recorded as a [`ModelFailure`] and left
//! out of every later stage; the run itself only fails on input errors.

use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate, EvaluationRow, ThresholdReport};
use crate::features::FeatureEngineer;
use crate::forecast::{combine, CombinedRecord, ForecastGenerator, ForecastRecord};
use crate::models::{default_adapters, Horizon, ModelAdapter, PredictionSet, TrainedModel};
use crate::schema::FeatureMatrix;
use crate::series::TimeSeries;
use crate::split::{chronological_split, Split};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Pipeline stage at which a model dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Train,
    Predict,
    Evaluate,
    Forecast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Train => "train",
            Stage::Predict => "predict",
            Stage::Evaluate => "evaluate",
            Stage::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: String,
    pub stage: Stage,
    pub reason: String,
}

impl ModelFailure {
    fn new(model: &str, stage: Stage, error: &ForecastError) -> Self {
        warn!(model = %model, stage = %stage, reason = %error, "model excluded");
        Self {
            model: model.to_string(),
            stage,
            reason: error.to_string(),
        }
    }
}

/// A model that trained and predicted the test partition.
pub struct ModelRun {
    pub model: Box<dyn TrainedModel>,
    pub predictions: PredictionSet,
}

pub type ModelOutcome = std::result::Result<ModelRun, ModelFailure>;

/// Test-partition actuals plus one prediction column per evaluated model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionTable {
    pub dates: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl PredictionTable {
    fn new(test: &FeatureMatrix) -> Self {
        Self {
            dates: test.dates().to_vec(),
            actual: test.values().to_vec(),
            columns: Vec::new(),
        }
    }

    /// Output column name for a model, e.g. `arima_pred`.
    pub fn column_name(model: &str) -> String {
        format!("{}_pred", model.to_lowercase())
    }

    pub fn get(&self, model: &str) -> Option<&[f64]> {
        let name = Self::column_name(model);
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// One row per evaluated model, in adapter order.
    pub evaluation: Vec<EvaluationRow>,
    pub predictions: PredictionTable,
    pub forecast: Option<Vec<ForecastRecord>>,
    pub combined: Vec<CombinedRecord>,
    pub failures: Vec<ModelFailure>,
    pub thresholds: Vec<ThresholdReport>,
}

impl PipelineReport {
    pub fn best_by_rmse(&self) -> Option<&EvaluationRow> {
        self.evaluation
            .iter()
            .min_by(|a, b| a.rmse.total_cmp(&b.rmse))
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    engineer: FeatureEngineer,
    adapters: Vec<Box<dyn ModelAdapter>>,
}

impl Pipeline {
    /// Pipeline with the three standard adapters.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let adapters = default_adapters(&config.models);
        Self::with_adapters(config, adapters)
    }

    pub fn with_adapters(
        config: PipelineConfig,
        adapters: Vec<Box<dyn ModelAdapter>>,
    ) -> Result<Self> {
        config.validate()?;
        if !adapters.iter().any(|a| a.name() == config.forecast.model) {
            return Err(ForecastError::invalid_parameter(
                "forecast.model",
                &config.forecast.model,
                "no registered adapter has this name",
            ));
        }
        let mut names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ForecastError::InvalidInput(
                "adapter names must be unique".to_string(),
            ));
        }
        Ok(Self {
            engineer: FeatureEngineer::new(config.features.clone()),
            config,
            adapters,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Engineer features from a raw series, then run every stage.
    pub fn run(&self, series: &TimeSeries) -> Result<PipelineReport> {
        let matrix = self.engineer.engineer(series)?;
        self.run_matrix(&matrix)
    }

    /// Run every stage on an already engineered feature matrix.
    pub fn run_matrix(&self, matrix: &FeatureMatrix) -> Result<PipelineReport> {
        let min_points = self.config.thresholds.min_data_points;
        if matrix.len() < min_points {
            warn!(
                rows = matrix.len(),
                min_points, "series is shorter than the recommended history"
            );
        }

        let split = chronological_split(matrix, self.config.split.test_ratio)?;

        let outcomes: Vec<ModelOutcome> = self
            .adapters
            .par_iter()
            .map(|adapter| train_and_predict(adapter.as_ref(), &split))
            .collect();

        let actual_mean = split.test.values().iter().sum::<f64>() / split.test.len() as f64;
        let mut evaluation = Vec::new();
        let mut thresholds = Vec::new();
        let mut failures = Vec::new();
        let mut predictions = PredictionTable::new(&split.test);
        let mut trained: Vec<Option<Box<dyn TrainedModel>>> = Vec::new();

        for (adapter, outcome) in self.adapters.iter().zip(outcomes) {
            let run = match outcome {
                Ok(run) => run,
                Err(failure) => {
                    failures.push(failure);
                    trained.push(None);
                    continue;
                }
            };
            match evaluate(adapter.name(), &split.test, &run.predictions) {
                Ok(row) => {
                    info!(
                        model = %row.model,
                        mae = row.mae,
                        rmse = row.rmse,
                        mape = ?row.mape,
                        r2 = row.r2,
                        "model evaluated"
                    );
                    thresholds.push(self.config.thresholds.assess(&row, actual_mean));
                    let column = PredictionTable::column_name(adapter.name());
                    predictions.columns.push((column, run.predictions.point));
                    evaluation.push(row);
                    trained.push(Some(run.model));
                }
                Err(e) => {
                    failures.push(ModelFailure::new(adapter.name(), Stage::Evaluate, &e));
                    trained.push(None);
                }
            }
        }

        let forecast = self.forecast(matrix, &trained, &mut failures);
        let combined = combine(&matrix.to_series()?, forecast.as_deref().unwrap_or(&[]));

        info!(
            evaluated = evaluation.len(),
            failed = failures.len(),
            forecast_rows = forecast.as_ref().map_or(0, |f| f.len()),
            "pipeline finished"
        );

        Ok(PipelineReport {
            evaluation,
            predictions,
            forecast,
            combined,
            failures,
            thresholds,
        })
    }

    /// Forecast with the designated model, refitted on the full history when
    /// configured. Falls back to the test-stage model if the refit fails.
    fn forecast(
        &self,
        matrix: &FeatureMatrix,
        trained: &[Option<Box<dyn TrainedModel>>],
        failures: &mut Vec<ModelFailure>,
    ) -> Option<Vec<ForecastRecord>> {
        let name = self.config.forecast.model.as_str();
        let index = self.adapters.iter().position(|a| a.name() == name)?;
        let adapter = self.adapters[index].as_ref();
        let evaluated = trained[index].as_deref()?;

        if !adapter.supports_future_horizon() {
            failures.push(ModelFailure::new(
                name,
                Stage::Forecast,
                &ForecastError::UnsupportedHorizon(name.to_string()),
            ));
            return None;
        }

        let refitted = if self.config.forecast.refit_on_full_history {
            match adapter.train(matrix) {
                Ok(model) => Some(model),
                Err(e) => {
                    warn!(
                        model = %name,
                        reason = %e,
                        "refit on full history failed, using test-stage model"
                    );
                    None
                }
            }
        } else {
            None
        };
        let model = refitted.as_deref().unwrap_or(evaluated);

        let result = ForecastGenerator::new(self.config.forecast.horizon).and_then(|generator| {
            let last = matrix
                .last_date()
                .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;
            generator.generate(model, last)
        });
        match result {
            Ok(records) => Some(records),
            Err(e) => {
                failures.push(ModelFailure::new(name, Stage::Forecast, &e));
                None
            }
        }
    }
}

fn train_and_predict(adapter: &dyn ModelAdapter, split: &Split) -> ModelOutcome {
    let name = adapter.name();
    let model = adapter
        .train(&split.train)
        .map_err(|e| ModelFailure::new(name, Stage::Train, &e))?;
    let predictions = model
        .predict(&Horizon::Partition(&split.test))
        .map_err(|e| ModelFailure::new(name, Stage::Predict, &e))?;
    info!(model = %name, rows = predictions.len(), "model trained");
    Ok(ModelRun { model, predictions })
}
