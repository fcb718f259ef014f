//! End-to-end pipeline scenarios.

use chrono::{Datelike, Days, NaiveDate};
use salesfc_core::{
    chronological_split, FeatureEngineer, FeatureMatrix, ForecastError, GradientBoostingAdapter,
    Horizon, ModelAdapter, Pipeline, PipelineConfig, PredictionSet, PredictionTable,
    SeasonalTrendAdapter, Stage, TimeSeries, TimeSeriesPoint, TrainedModel,
};
use std::f64::consts::PI;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn series(n: usize, f: impl Fn(usize, NaiveDate) -> f64) -> TimeSeries {
    TimeSeries::new(
        (0..n)
            .map(|i| {
                let d = start() + Days::new(i as u64);
                TimeSeriesPoint::new(d, f(i, d))
            })
            .collect(),
    )
    .unwrap()
}

fn linear_series() -> TimeSeries {
    series(1460, |i, _| 500.0 + 0.1 * i as f64)
}

fn seasonal_series(n: usize) -> TimeSeries {
    series(n, |i, d| {
        let yearly = 40.0 * (2.0 * PI * d.ordinal() as f64 / 365.25).sin();
        let weekly = if d.weekday().number_from_monday() >= 6 {
            25.0
        } else {
            0.0
        };
        300.0 + 0.05 * i as f64 + yearly + weekly + 3.0 * ((i as f64) * 1.3).sin()
    })
}

fn custom_pipeline(adapters: Vec<Box<dyn ModelAdapter>>) -> Pipeline {
    Pipeline::with_adapters(PipelineConfig::default(), adapters).unwrap()
}

/// Echoes the actual values of whatever partition it is asked about.
struct Oracle;

struct OracleModel;

impl ModelAdapter for Oracle {
    fn name(&self) -> &str {
        "Oracle"
    }

    fn supports_future_horizon(&self) -> bool {
        false
    }

    fn train(&self, _train: &FeatureMatrix) -> salesfc_core::Result<Box<dyn TrainedModel>> {
        Ok(Box::new(OracleModel))
    }
}

impl TrainedModel for OracleModel {
    fn name(&self) -> &str {
        "Oracle"
    }

    fn predict(&self, horizon: &Horizon<'_>) -> salesfc_core::Result<PredictionSet> {
        match horizon {
            Horizon::Partition(m) => PredictionSet::new(m.dates().to_vec(), m.values().to_vec()),
            Horizon::Future(_) => Err(ForecastError::UnsupportedHorizon("Oracle".into())),
        }
    }
}

/// Always fails to train.
struct Broken;

impl ModelAdapter for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    fn supports_future_horizon(&self) -> bool {
        true
    }

    fn train(&self, _train: &FeatureMatrix) -> salesfc_core::Result<Box<dyn TrainedModel>> {
        Err(ForecastError::ComputationError("did not converge".into()))
    }
}

/// Trains, then fails on every prediction.
struct FailsToPredict;

struct FailingModel;

impl ModelAdapter for FailsToPredict {
    fn name(&self) -> &str {
        "FailsToPredict"
    }

    fn supports_future_horizon(&self) -> bool {
        true
    }

    fn train(&self, _train: &FeatureMatrix) -> salesfc_core::Result<Box<dyn TrainedModel>> {
        Ok(Box::new(FailingModel))
    }
}

impl TrainedModel for FailingModel {
    fn name(&self) -> &str {
        "FailsToPredict"
    }

    fn predict(&self, _horizon: &Horizon<'_>) -> salesfc_core::Result<PredictionSet> {
        Err(ForecastError::ComputationError("singular system".into()))
    }
}

/// Predicts the right values for the day after each requested date.
struct Shifted;

struct ShiftedModel;

impl ModelAdapter for Shifted {
    fn name(&self) -> &str {
        "Shifted"
    }

    fn supports_future_horizon(&self) -> bool {
        false
    }

    fn train(&self, _train: &FeatureMatrix) -> salesfc_core::Result<Box<dyn TrainedModel>> {
        Ok(Box::new(ShiftedModel))
    }
}

impl TrainedModel for ShiftedModel {
    fn name(&self) -> &str {
        "Shifted"
    }

    fn predict(&self, horizon: &Horizon<'_>) -> salesfc_core::Result<PredictionSet> {
        let dates = horizon.dates().iter().map(|d| *d + Days::new(1)).collect();
        PredictionSet::new(dates, vec![1.0; horizon.len()])
    }
}

/// Seasonal model that refuses to train on more than `max_rows` rows.
struct CappedSeasonal {
    max_rows: usize,
}

impl ModelAdapter for CappedSeasonal {
    fn name(&self) -> &str {
        "SeasonalTrend"
    }

    fn supports_future_horizon(&self) -> bool {
        true
    }

    fn train(&self, train: &FeatureMatrix) -> salesfc_core::Result<Box<dyn TrainedModel>> {
        if train.len() > self.max_rows {
            return Err(ForecastError::ComputationError("too many rows".into()));
        }
        SeasonalTrendAdapter::default().train(train)
    }
}

#[test]
fn gradient_boosting_tracks_linear_trend() {
    let ts = linear_series();
    let pipeline = custom_pipeline(vec![
        Box::new(SeasonalTrendAdapter::default()),
        Box::new(GradientBoostingAdapter::default()),
    ]);
    let report = pipeline.run(&ts).unwrap();

    let mean = ts.mean().unwrap();
    let gbt = report
        .evaluation
        .iter()
        .find(|r| r.model == "GradientBoosting")
        .expect("gradient boosting evaluated");
    assert!(
        gbt.rmse < 0.05 * mean,
        "rmse {} exceeds 5% of mean {}",
        gbt.rmse,
        mean
    );
    assert_eq!(report.predictions.dates.len(), 292);
    assert_eq!(report.predictions.get("GradientBoosting").unwrap().len(), 292);
}

#[test]
fn seasonal_forecast_covers_next_year() {
    let ts = seasonal_series(1461);
    let pipeline = custom_pipeline(vec![Box::new(SeasonalTrendAdapter::default())]);
    let report = pipeline.run(&ts).unwrap();

    let forecast = report.forecast.expect("forecast produced");
    assert_eq!(forecast.len(), 365);

    let last = ts.last_date().unwrap();
    for (k, record) in forecast.iter().enumerate() {
        assert_eq!(record.date, last + Days::new(k as u64 + 1));
        assert!(record.forecast >= 0.0 && record.lower >= 0.0 && record.upper >= 0.0);
        assert!(record.lower <= record.forecast && record.forecast <= record.upper);
    }

    assert_eq!(report.combined.len(), 1461 + 365);
    assert!(report.combined[..1461]
        .iter()
        .all(|r| r.forecast_lower.is_none() && r.forecast_upper.is_none()));
    assert!(report.combined[1461..]
        .iter()
        .all(|r| r.forecast_lower.is_some() && r.forecast_upper.is_some()));

    let seasonal = &report.evaluation[0];
    assert!(seasonal.r2 > 0.8, "r2 = {}", seasonal.r2);
}

#[test]
fn split_is_chronological_and_contiguous() {
    let matrix = FeatureEngineer::default().engineer(&linear_series()).unwrap();
    let split = chronological_split(&matrix, 0.2).unwrap();
    let last_train = split.train.last_date().unwrap();
    let first_test = split.test.first_date().unwrap();
    assert_eq!(first_test, last_train + Days::new(1));
    assert_eq!(split.train.len() + split.test.len(), matrix.len());
    assert_eq!(split.train.n_features(), matrix.n_features());
}

#[test]
fn failed_model_is_excluded_everywhere() {
    let ts = seasonal_series(500);
    let pipeline = custom_pipeline(vec![
        Box::new(SeasonalTrendAdapter::default()),
        Box::new(Broken),
        Box::new(Oracle),
    ]);
    let report = pipeline.run(&ts).unwrap();

    let names: Vec<&str> = report.evaluation.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(names, vec!["SeasonalTrend", "Oracle"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].model, "Broken");
    assert_eq!(report.failures[0].stage, Stage::Train);
    assert!(report.failures[0].reason.contains("did not converge"));
    assert!(report.predictions.get("Broken").is_none());
    assert_eq!(report.thresholds.len(), 2);
}

#[test]
fn models_failing_after_training_are_excluded() {
    let ts = seasonal_series(500);
    let pipeline = custom_pipeline(vec![
        Box::new(SeasonalTrendAdapter::default()),
        Box::new(FailsToPredict),
        Box::new(Shifted),
        Box::new(Oracle),
    ]);
    let report = pipeline.run(&ts).unwrap();

    let names: Vec<&str> = report.evaluation.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(names, vec!["SeasonalTrend", "Oracle"]);
    assert_eq!(report.thresholds.len(), 2);
    assert_eq!(report.predictions.columns.len(), 2);

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].model, "FailsToPredict");
    assert_eq!(report.failures[0].stage, Stage::Predict);
    assert!(report.failures[0].reason.contains("singular system"));
    assert_eq!(report.failures[1].model, "Shifted");
    assert_eq!(report.failures[1].stage, Stage::Evaluate);

    assert!(report.predictions.get("FailsToPredict").is_none());
    assert!(report.predictions.get("Shifted").is_none());
    assert_eq!(report.forecast.map(|f| f.len()), Some(365));
}

#[test]
fn designated_model_failing_prediction_skips_forecast() {
    let mut config = PipelineConfig::default();
    config.forecast.model = "FailsToPredict".to_string();
    let pipeline = Pipeline::with_adapters(
        config,
        vec![Box::new(FailsToPredict), Box::new(Oracle)],
    )
    .unwrap();
    let report = pipeline.run(&seasonal_series(200)).unwrap();

    assert!(report.forecast.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Predict);
    assert_eq!(report.evaluation.len(), 1);
    assert_eq!(report.combined.len(), 200);
}

#[test]
fn exact_predictions_score_perfectly() {
    let ts = seasonal_series(400);
    let pipeline = custom_pipeline(vec![
        Box::new(SeasonalTrendAdapter::default()),
        Box::new(Oracle),
    ]);
    let report = pipeline.run(&ts).unwrap();

    let oracle = &report.evaluation[1];
    assert_eq!(oracle.r2, 1.0);
    assert_eq!(oracle.mae, 0.0);
    assert_eq!(oracle.rmse, 0.0);
    assert_eq!(
        report.predictions.columns[1].0,
        PredictionTable::column_name("Oracle")
    );
    assert!(report.thresholds[1].passed());
}

#[test]
fn refit_failure_falls_back_to_test_stage_model() {
    let ts = seasonal_series(300);
    let pipeline = custom_pipeline(vec![Box::new(CappedSeasonal { max_rows: 260 })]);
    let report = pipeline.run(&ts).unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.forecast.map(|f| f.len()), Some(365));
}

#[test]
fn forecast_model_without_future_support_is_reported() {
    let mut config = PipelineConfig::default();
    config.forecast.model = "Oracle".to_string();
    let pipeline = Pipeline::with_adapters(config, vec![Box::new(Oracle)]).unwrap();
    let report = pipeline.run(&seasonal_series(200)).unwrap();

    assert!(report.forecast.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Forecast);
    assert_eq!(report.combined.len(), 200);
}

#[test]
fn standard_pipeline_reports_every_model_once() {
    let ts = seasonal_series(730);
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let report = pipeline.run(&ts).unwrap();

    let mut seen: Vec<&str> = report
        .evaluation
        .iter()
        .map(|r| r.model.as_str())
        .chain(report.failures.iter().filter(|f| f.stage != Stage::Forecast).map(|f| f.model.as_str()))
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, vec!["ARIMA", "GradientBoosting", "SeasonalTrend"]);

    // Evaluation rows keep adapter order.
    let order = ["SeasonalTrend", "ARIMA", "GradientBoosting"];
    let positions: Vec<usize> = report
        .evaluation
        .iter()
        .map(|r| order.iter().position(|n| *n == r.model).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn empty_series_is_an_input_error() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let empty = TimeSeries::new(Vec::new()).unwrap();
    assert!(matches!(
        pipeline.run(&empty),
        Err(ForecastError::InsufficientData { .. })
    ));
}
