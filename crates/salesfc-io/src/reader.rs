//! CSV input files.
//!
//! A feature file has a `date` column (`%Y-%m-%d`), a `sales` column and any
//! number of further numeric columns. Rows may come in any order; they are
//! sorted by date before the series is validated.

use crate::error::{IoError, Result};
use chrono::NaiveDate;
use salesfc_core::{
    FeatureBlock, FeatureColumn, FeatureFamily, FeatureMatrix, ForecastError, TimeSeries,
    TimeSeriesPoint,
};
use std::path::Path;
use tracing::info;

pub const DATE_COLUMN: &str = "date";
pub const TARGET_COLUMN: &str = "sales";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw rows of a feature file, before sorting.
struct Table {
    feature_names: Vec<String>,
    rows: Vec<Row>,
}

struct Row {
    date: NaiveDate,
    sales: f64,
    features: Vec<Option<f64>>,
}

fn parse_date(field: &str, row: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(field.trim(), DATE_FORMAT).map_err(|e| {
        ForecastError::InvalidDateFormat(format!("'{}' at row {}: {}", field, row, e)).into()
    })
}

/// Empty cells are missing values; booleans are read as 0/1.
fn parse_cell(field: &str, column: &str, row: usize) -> Result<Option<f64>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    match field {
        "true" | "True" | "TRUE" => return Ok(Some(1.0)),
        "false" | "False" | "FALSE" => return Ok(Some(0.0)),
        _ => {}
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| IoError::InvalidNumber {
            column: column.to_string(),
            row,
            value: field.to_string(),
        })
}

fn read_table(path: &Path, keep_features: bool) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    };
    let date_idx = position(DATE_COLUMN)?;
    let sales_idx = position(TARGET_COLUMN)?;

    let feature_idx: Vec<usize> = if keep_features {
        (0..headers.len())
            .filter(|&i| i != date_idx && i != sales_idx)
            .collect()
    } else {
        Vec::new()
    };
    let feature_names: Vec<String> = feature_idx
        .iter()
        .map(|&i| headers[i].trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // Row numbers are 1-based and count the header line.
        let row = i + 2;
        let date = parse_date(record.get(date_idx).unwrap_or_default(), row)?;
        let sales = parse_cell(record.get(sales_idx).unwrap_or_default(), TARGET_COLUMN, row)?
            .ok_or_else(|| IoError::InvalidNumber {
                column: TARGET_COLUMN.to_string(),
                row,
                value: String::new(),
            })?;
        let features = feature_idx
            .iter()
            .zip(&feature_names)
            .map(|(&j, name)| parse_cell(record.get(j).unwrap_or_default(), name, row))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row {
            date,
            sales,
            features,
        });
    }

    rows.sort_by_key(|r| r.date);
    Ok(Table {
        feature_names,
        rows,
    })
}

fn to_series(rows: &[Row]) -> Result<TimeSeries> {
    let points = rows
        .iter()
        .map(|r| TimeSeriesPoint::new(r.date, r.sales))
        .collect();
    Ok(TimeSeries::new(points)?)
}

/// Read the `date` and `sales` columns only.
pub fn read_series_csv(path: impl AsRef<Path>) -> Result<TimeSeries> {
    let path = path.as_ref();
    let table = read_table(path, false)?;
    let series = to_series(&table.rows)?;
    info!(path = %path.display(), rows = series.len(), "series file loaded");
    Ok(series)
}

/// Read a pre-engineered feature file.
///
/// Every column besides `date` and `sales` becomes an external feature;
/// missing cells go through the same terminal fill as derived features.
pub fn read_feature_csv(path: impl AsRef<Path>) -> Result<FeatureMatrix> {
    let path = path.as_ref();
    let table = read_table(path, true)?;
    let series = to_series(&table.rows)?;

    let mut block = FeatureBlock::new(FeatureFamily::External);
    for (j, name) in table.feature_names.iter().enumerate() {
        block.push(FeatureColumn::new(
            name.as_str(),
            table.rows.iter().map(|r| r.features[j]).collect(),
        ));
    }

    let matrix = FeatureMatrix::from_blocks(&series, vec![block])?;
    info!(
        path = %path.display(),
        rows = matrix.len(),
        features = matrix.n_features(),
        "feature file loaded"
    );
    Ok(matrix)
}
