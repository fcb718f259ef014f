//! File boundary for the salesfc pipeline.
//!
//! Reads daily sales (optionally with pre-engineered feature columns) from
//! CSV, loads JSON configuration, and writes the evaluation, test prediction
//! and combined forecast outputs.

pub mod config;
pub mod error;
pub mod reader;
pub mod writer;

pub use config::{load_config, save_config};
pub use error::{IoError, Result};
pub use reader::{read_feature_csv, read_series_csv, DATE_COLUMN, DATE_FORMAT, TARGET_COLUMN};
pub use writer::{
    write_evaluation_json, write_forecast_csv, write_predictions_csv, write_report, ReportFiles,
    EVALUATION_FILE, FORECAST_FILE, PREDICTIONS_FILE,
};
