//! Error types for the salesfc-io crate

use salesfc_core::ForecastError;
use thiserror::Error;

/// Errors raised while reading inputs or writing outputs.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

pub type Result<T> = std::result::Result<T, IoError>;
