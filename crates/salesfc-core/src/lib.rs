//! Core library for daily sales forecasting.
//!
//! This crate turns a daily (date, value) series into an engineered feature
//! matrix, trains and evaluates competing forecast models on a chronological
//! hold-out, and extends the designated model beyond the observed range.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod forecast;
pub mod imputation;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod series;
pub mod split;

// Re-exports for convenience
pub use config::{
    default_holidays, ArimaConfig, BoostingConfig, FeatureConfig, ForecastConfig, Holiday,
    ModelConfig, PerformanceThresholds, PipelineConfig, SeasonalConfig, SeasonalityMode,
    SplitConfig,
};
pub use error::{ForecastError, Result};
pub use evaluation::{evaluate, EvaluationRow, ThresholdReport};
pub use features::FeatureEngineer;
pub use forecast::{combine, CombinedRecord, DataType, ForecastGenerator, ForecastRecord};
pub use metrics::{mae, mape, mse, r2, rmse};
pub use models::{
    default_adapters, ArimaAdapter, GradientBoostingAdapter, Horizon, ModelAdapter,
    PredictionSet, SeasonalTrendAdapter, TrainedModel,
};
pub use pipeline::{ModelFailure, ModelOutcome, Pipeline, PipelineReport, PredictionTable, Stage};
pub use schema::{FeatureBlock, FeatureColumn, FeatureFamily, FeatureMatrix, FeatureRecord};
pub use series::{TimeSeries, TimeSeriesPoint};
pub use split::{chronological_split, Split};
