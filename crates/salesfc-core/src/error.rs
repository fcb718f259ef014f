//! Error types for the sales forecasting core.

use thiserror::Error;

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for feature engineering, model and pipeline operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Unsupported horizon for model {0}: only test partitions can be predicted")]
    UnsupportedHorizon(String),

    #[error("Model not fitted: {0}")]
    NotFitted(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),
}

impl ForecastError {
    /// Shorthand for building an [`ForecastError::InvalidParameter`].
    pub fn invalid_parameter(
        param: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ForecastError::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
