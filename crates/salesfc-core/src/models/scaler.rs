//! Standard (z-score) feature scaling.

use crate::error::{ForecastError, Result};

/// Per-column centre and scale of a fitted standard scaler.
#[derive(Debug, Clone, PartialEq)]
struct ScalerParams {
    center: f64,
    scale: f64,
}

/// Z-score scaler fitted on training columns only.
///
/// Uses the population standard deviation; a constant column gets scale 1 so
/// it maps to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    pub fn fit(columns: &[&[f64]]) -> Result<Self> {
        let params = columns
            .iter()
            .map(|col| {
                if col.is_empty() {
                    return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
                }
                let n = col.len() as f64;
                let mean = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                Ok(ScalerParams {
                    center: mean,
                    scale: if std > 0.0 && std.is_finite() { std } else { 1.0 },
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { params })
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    /// Scale columns in the order they were fitted.
    pub fn transform(&self, columns: &[&[f64]]) -> Result<Vec<Vec<f64>>> {
        if columns.len() != self.params.len() {
            return Err(ForecastError::InvalidInput(format!(
                "scaler fitted on {} columns, got {}",
                self.params.len(),
                columns.len()
            )));
        }
        Ok(columns
            .iter()
            .zip(&self.params)
            .map(|(col, p)| col.iter().map(|x| (x - p.center) / p.scale).collect())
            .collect())
    }
}
