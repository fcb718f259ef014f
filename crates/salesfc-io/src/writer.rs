//! Pipeline outputs: evaluation JSON, test predictions CSV and the combined
//! historical/forecast CSV.

use crate::error::Result;
use crate::reader::DATE_FORMAT;
use salesfc_core::{CombinedRecord, EvaluationRow, ForecastError, PipelineReport, PredictionTable};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EVALUATION_FILE: &str = "model_comparison_results.json";
pub const PREDICTIONS_FILE: &str = "test_predictions.csv";
pub const FORECAST_FILE: &str = "powerbi_data.csv";

/// `[{"Model": .., "MAE": .., "RMSE": .., "MAPE": .., "R2": ..}, ..]`
pub fn write_evaluation_json(path: impl AsRef<Path>, rows: &[EvaluationRow]) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, rows)?;
    Ok(())
}

/// `date, actual_sales, <model>_pred, ..`
pub fn write_predictions_csv(path: impl AsRef<Path>, table: &PredictionTable) -> Result<()> {
    let n = table.dates.len();
    if table.actual.len() != n {
        return Err(ForecastError::InvalidInput(format!(
            "prediction table has {} dates but {} actual values",
            n,
            table.actual.len()
        ))
        .into());
    }
    if let Some((name, _)) = table.columns.iter().find(|(_, v)| v.len() != n) {
        return Err(ForecastError::InvalidInput(format!(
            "prediction column '{}' does not have {} rows",
            name, n
        ))
        .into());
    }

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let mut header = vec!["date".to_string(), "actual_sales".to_string()];
    header.extend(table.columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header)?;

    for i in 0..n {
        let mut record = vec![
            table.dates[i].format(DATE_FORMAT).to_string(),
            table.actual[i].to_string(),
        ];
        record.extend(table.columns.iter().map(|(_, v)| v[i].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// `date, sales, data_type, forecast_lower, forecast_upper`; bounds are empty
/// for historical rows.
pub fn write_forecast_csv(path: impl AsRef<Path>, records: &[CombinedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Locations of the files written by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub evaluation: PathBuf,
    pub predictions: PathBuf,
    pub forecast: PathBuf,
}

/// Write all three outputs into `dir`, creating it if needed.
pub fn write_report(dir: impl AsRef<Path>, report: &PipelineReport) -> Result<ReportFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let files = ReportFiles {
        evaluation: dir.join(EVALUATION_FILE),
        predictions: dir.join(PREDICTIONS_FILE),
        forecast: dir.join(FORECAST_FILE),
    };
    write_evaluation_json(&files.evaluation, &report.evaluation)?;
    write_predictions_csv(&files.predictions, &report.predictions)?;
    write_forecast_csv(&files.forecast, &report.combined)?;

    info!(
        dir = %dir.display(),
        models = report.evaluation.len(),
        combined_rows = report.combined.len(),
        "report written"
    );
    Ok(files)
}
