//! Feature schema and the immutable feature matrix.
//!
//! Each derivation step of the feature engineer returns a [`FeatureBlock`]: a
//! named set of new columns tagged with the [`FeatureFamily`] that produced
//! them. Blocks are appended, in order, into a [`FeatureSchema`] that
//! describes the row type of the resulting [`FeatureMatrix`]. Once built, the
//! matrix is never mutated; partitions are produced with
//! [`FeatureMatrix::slice`].

use crate::error::{ForecastError, Result};
use crate::imputation::fill_nulls_terminal;
use crate::series::TimeSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::Range;

/// Version of the column layout produced by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// The derivation step a column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFamily {
    Calendar,
    Rolling,
    Lag,
    Difference,
    PercentChange,
    Seasonal,
    Holiday,
    Trend,
    /// Columns supplied by the caller, e.g. read from a feature file.
    External,
}

/// One derived column before the terminal fill; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a column with no missing cells.
    pub fn dense(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Output of a single derivation step.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    pub family: FeatureFamily,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureBlock {
    pub fn new(family: FeatureFamily) -> Self {
        Self {
            family,
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, column: FeatureColumn) {
        self.columns.push(column);
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Name and family of one matrix column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub family: FeatureFamily,
}

/// Ordered description of the feature columns of a matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    pub version: u32,
    columns: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl FeatureSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; names must be unique.
    pub fn push(&mut self, name: &str, family: FeatureFamily) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(ForecastError::InvalidInput(format!(
                "duplicate feature column '{}'",
                name
            )));
        }
        self.index.insert(name.to_string(), self.columns.len());
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            family,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn family_count(&self, family: FeatureFamily) -> usize {
        self.columns.iter().filter(|c| c.family == family).count()
    }
}

/// Date-indexed rows of the target value plus every derived feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    schema: FeatureSchema,
    /// Column-major storage, one vector per schema column.
    columns: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Assemble a matrix from derived blocks, resolving missing cells with
    /// the terminal fill (backward, then forward, then zero).
    pub fn from_blocks(series: &TimeSeries, blocks: Vec<FeatureBlock>) -> Result<Self> {
        let n = series.len();
        let mut schema = FeatureSchema::new();
        let mut columns = Vec::new();

        for block in blocks {
            for column in block.columns {
                if column.values.len() != n {
                    return Err(ForecastError::InvalidInput(format!(
                        "feature column '{}' has {} rows, series has {}",
                        column.name,
                        column.values.len(),
                        n
                    )));
                }
                schema.push(&column.name, block.family)?;
                columns.push(fill_nulls_terminal(&column.values));
            }
        }

        Ok(Self {
            dates: series.dates().to_vec(),
            values: series.values().to_vec(),
            schema,
            columns,
        })
    }

    /// A matrix that carries only the date and target value.
    pub fn from_series(series: &TimeSeries) -> Self {
        Self {
            dates: series.dates().to_vec(),
            values: series.values().to_vec(),
            schema: FeatureSchema::new(),
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Target values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.schema.names().collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.schema
            .position(name)
            .map(|j| self.columns[j].as_slice())
    }

    pub fn column_at(&self, j: usize) -> &[f64] {
        &self.columns[j]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Row view at `index`.
    pub fn row(&self, index: usize) -> Option<FeatureRecord<'_>> {
        (index < self.len()).then_some(FeatureRecord {
            matrix: self,
            index,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureRecord<'_>> {
        (0..self.len()).map(move |index| FeatureRecord {
            matrix: self,
            index,
        })
    }

    /// Owned copy of a contiguous range of rows.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(ForecastError::InvalidInput(format!(
                "row range {:?} out of bounds for {} rows",
                range,
                self.len()
            )));
        }
        Ok(Self {
            dates: self.dates[range.clone()].to_vec(),
            values: self.values[range.clone()].to_vec(),
            schema: self.schema.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c[range.clone()].to_vec())
                .collect(),
        })
    }

    /// The (date, value) series underlying the matrix.
    pub fn to_series(&self) -> Result<TimeSeries> {
        TimeSeries::from_parts(self.dates.clone(), self.values.clone())
    }
}

/// Borrowed view of one matrix row.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRecord<'a> {
    matrix: &'a FeatureMatrix,
    index: usize,
}

impl<'a> FeatureRecord<'a> {
    pub fn date(&self) -> NaiveDate {
        self.matrix.dates[self.index]
    }

    pub fn value(&self) -> f64 {
        self.matrix.values[self.index]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.matrix
            .schema
            .position(name)
            .map(|j| self.matrix.columns[j][self.index])
    }

    /// Feature values in schema order.
    pub fn features(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let index = self.index;
        let matrix = self.matrix;
        matrix
            .schema
            .columns
            .iter()
            .zip(matrix.columns.iter())
            .map(move |(spec, col)| (spec.name.as_str(), col[index]))
    }
}
