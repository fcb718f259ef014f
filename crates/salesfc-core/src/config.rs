//! Pipeline configuration.
//!
//! Every knob of the feature engineer, the split, the three model adapters and
//! the forecast stage lives in [`PipelineConfig`]. All structures deserialize
//! with `#[serde(default)]`, so a partial JSON document only overrides the keys
//! it names.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// A recurring holiday given as a (month, day) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub month: u32,
    pub day: u32,
}

impl Holiday {
    pub fn new(name: impl Into<String>, month: u32, day: u32) -> Self {
        Self {
            name: name.into(),
            month,
            day,
        }
    }
}

/// Default retail holiday calendar.
pub fn default_holidays() -> Vec<Holiday> {
    vec![
        Holiday::new("new_year", 1, 1),
        Holiday::new("valentine_day", 2, 14),
        Holiday::new("independence_day", 7, 4),
        Holiday::new("black_friday", 11, 27),
        Holiday::new("cyber_monday", 11, 30),
        Holiday::new("christmas", 12, 25),
        Holiday::new("boxing_day", 12, 26),
    ]
}

/// Feature engineering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rolling window sizes for mean/std/min/max
    pub rolling_windows: Vec<usize>,
    /// Lag offsets in rows
    pub lag_periods: Vec<usize>,
    /// First-difference offsets
    pub diff_periods: Vec<usize>,
    /// Percentage-change offsets
    pub pct_change_periods: Vec<usize>,
    /// OLS trend-slope windows
    pub trend_windows: Vec<usize>,
    /// Holiday calendar
    pub holidays: Vec<Holiday>,
    /// Added to bucket means before dividing in seasonal ratios
    pub seasonal_ratio_epsilon: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_windows: vec![7, 14, 30, 90, 365],
            lag_periods: vec![1, 7, 14, 30, 365],
            diff_periods: vec![1, 7, 30],
            pct_change_periods: vec![1, 7, 30],
            trend_windows: vec![7, 30, 90],
            holidays: default_holidays(),
            seasonal_ratio_epsilon: 1e-6,
        }
    }
}

/// Train/test split options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Share of the most recent dates held out for testing
    pub test_ratio: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { test_ratio: 0.2 }
    }
}

/// Future forecast options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days to forecast beyond the last observed date
    pub horizon: usize,
    /// Name of the adapter that produces the future forecast
    pub model: String,
    /// Retrain the forecast model on the full history before extrapolating
    pub refit_on_full_history: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 365,
            model: "SeasonalTrend".to_string(),
            refit_on_full_history: true,
        }
    }
}

/// How seasonal terms combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Seasonal-decomposition model options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_fourier_order: usize,
    pub weekly_fourier_order: usize,
    pub mode: SeasonalityMode,
    /// Width of the prediction interval (0-1)
    pub interval_width: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            weekly_seasonality: true,
            yearly_fourier_order: 10,
            weekly_fourier_order: 3,
            mode: SeasonalityMode::Additive,
            interval_width: 0.95,
        }
    }
}

/// ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self { p: 5, d: 1, q: 2 }
    }
}

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio for each tree
    pub colsample_bytree: f64,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf values
    pub reg_lambda: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_samples_leaf: 1,
            reg_lambda: 1.0,
            random_state: 42,
        }
    }
}

/// Per-model hyperparameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub seasonal: SeasonalConfig,
    pub arima: ArimaConfig,
    pub boosting: BoostingConfig,
}

/// Targets a model should meet to be considered production quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub min_r2: f64,
    /// Maximum MAPE as a fraction
    pub max_mape: f64,
    /// Maximum RMSE as a fraction of the mean actual value
    pub target_rmse_percent: f64,
    /// Series shorter than this trigger a warning
    pub min_data_points: usize,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            min_r2: 0.6,
            max_mape: 0.25,
            target_rmse_percent: 0.15,
            min_data_points: 365,
        }
    }
}

/// Top-level configuration passed to [`crate::pipeline::Pipeline::new`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub split: SplitConfig,
    pub forecast: ForecastConfig,
    pub models: ModelConfig,
    pub thresholds: PerformanceThresholds,
}

impl PipelineConfig {
    /// Reject configurations no pipeline run could honour.
    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        for (param, sizes) in [
            ("rolling_windows", &f.rolling_windows),
            ("lag_periods", &f.lag_periods),
            ("diff_periods", &f.diff_periods),
            ("pct_change_periods", &f.pct_change_periods),
            ("trend_windows", &f.trend_windows),
        ] {
            if sizes.contains(&0) {
                return Err(ForecastError::invalid_parameter(
                    param,
                    format!("{:?}", sizes),
                    "all entries must be positive",
                ));
            }
        }

        for holiday in &f.holidays {
            if chrono::NaiveDate::from_ymd_opt(2000, holiday.month, holiday.day).is_none() {
                return Err(ForecastError::invalid_parameter(
                    format!("holidays.{}", holiday.name),
                    format!("{}/{}", holiday.month, holiday.day),
                    "not a valid month/day pair",
                ));
            }
        }

        let ratio = self.split.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ForecastError::invalid_parameter(
                "test_ratio",
                ratio,
                "must be in (0, 1)",
            ));
        }

        if self.forecast.horizon == 0 {
            return Err(ForecastError::invalid_parameter(
                "horizon",
                0,
                "must be positive",
            ));
        }

        let width = self.models.seasonal.interval_width;
        if !(width > 0.0 && width < 1.0) {
            return Err(ForecastError::invalid_parameter(
                "interval_width",
                width,
                "must be in (0, 1)",
            ));
        }

        let b = &self.models.boosting;
        if b.n_estimators == 0 || b.max_depth == 0 {
            return Err(ForecastError::invalid_parameter(
                "n_estimators/max_depth",
                format!("{}/{}", b.n_estimators, b.max_depth),
                "must be positive",
            ));
        }
        for (param, value) in [
            ("learning_rate", b.learning_rate),
            ("subsample", b.subsample),
            ("colsample_bytree", b.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ForecastError::invalid_parameter(
                    param,
                    value,
                    "must be in (0, 1]",
                ));
            }
        }
        if b.reg_lambda < 0.0 {
            return Err(ForecastError::invalid_parameter(
                "reg_lambda",
                b.reg_lambda,
                "must be non-negative",
            ));
        }

        Ok(())
    }
}
