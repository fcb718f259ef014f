//! Future forecasts and the combined historical/forecast record set.

use crate::error::{ForecastError, Result};
use crate::models::{Horizon, TrainedModel};
use crate::series::TimeSeries;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One forecast day; point and bounds are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Origin of a combined record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Historical,
    Forecast,
}

/// Row of the reporting table; bounds are only set for forecast rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub date: NaiveDate,
    pub sales: f64,
    pub data_type: DataType,
    pub forecast_lower: Option<f64>,
    pub forecast_upper: Option<f64>,
}

/// Extends a calendar-aware model `horizon` days beyond the observed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastGenerator {
    horizon: usize,
}

impl ForecastGenerator {
    pub fn new(horizon: usize) -> Result<Self> {
        if horizon == 0 {
            return Err(ForecastError::invalid_parameter(
                "horizon",
                0,
                "must be positive",
            ));
        }
        Ok(Self { horizon })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// `last_date + 1 ..= last_date + horizon`, one entry per day.
    pub fn future_dates(&self, last_date: NaiveDate) -> Result<Vec<NaiveDate>> {
        (1..=self.horizon as u64)
            .map(|k| {
                last_date.checked_add_days(Days::new(k)).ok_or_else(|| {
                    ForecastError::InvalidInput(format!(
                        "forecast date {} days after {} is out of range",
                        k, last_date
                    ))
                })
            })
            .collect()
    }

    /// Predict the future dates and clip point and bounds at zero.
    ///
    /// Models that do not report bounds get zero-width bounds.
    pub fn generate(
        &self,
        model: &dyn TrainedModel,
        last_date: NaiveDate,
    ) -> Result<Vec<ForecastRecord>> {
        let dates = self.future_dates(last_date)?;
        let prediction = model.predict(&Horizon::Future(&dates))?.clip_non_negative();
        if prediction.dates != dates {
            return Err(ForecastError::ComputationError(format!(
                "{} returned a forecast for the wrong dates",
                model.name()
            )));
        }

        let lower = prediction.lower.as_ref().unwrap_or(&prediction.point);
        let upper = prediction.upper.as_ref().unwrap_or(&prediction.point);
        let records: Vec<ForecastRecord> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| ForecastRecord {
                date: *date,
                forecast: prediction.point[i],
                lower: lower[i],
                upper: upper[i],
            })
            .collect();

        info!(
            model = %model.name(),
            horizon = records.len(),
            "forecast generated"
        );
        Ok(records)
    }
}

/// Historical rows followed by forecast rows.
pub fn combine(history: &TimeSeries, forecast: &[ForecastRecord]) -> Vec<CombinedRecord> {
    let historical = history
        .dates()
        .iter()
        .zip(history.values())
        .map(|(date, value)| CombinedRecord {
            date: *date,
            sales: *value,
            data_type: DataType::Historical,
            forecast_lower: None,
            forecast_upper: None,
        });
    let future = forecast.iter().map(|r| CombinedRecord {
        date: r.date,
        sales: r.forecast,
        data_type: DataType::Forecast,
        forecast_lower: Some(r.lower),
        forecast_upper: Some(r.upper),
    });
    historical.chain(future).collect()
}
