//! Feature engineering for daily sales series.
//!
//! Families are derived independently from the raw (date, value) series:
//!
//! | Family | Columns |
//! |--------|---------|
//! | Calendar | `year`, `month`, `day`, `day_of_week`, `day_of_year`, `quarter`, `week_of_year`, `is_weekend`, `is_month_start` ... `is_year_end` |
//! | Rolling | `rolling_{mean,std,min,max}_{w}` |
//! | Lag | `lag_{L}` |
//! | Difference | `diff_{k}` |
//! | PercentChange | `pct_change_{k}` |
//! | Seasonal | `{monthly,dow,quarter}_avg`, `{monthly,dow,quarter}_seasonality` |
//! | Holiday | `is_{holiday}` |
//! | Trend | `trend_{w}` |
//!
//! Rolling, lag, difference and trend columns only look backward. The
//! seasonal ratios do not: each bucket mean is taken over the whole series,
//! so those columns carry information from later rows. They are unsuitable
//! for strict backtesting unless re-derived per fold.

use crate::config::{FeatureConfig, Holiday};
use crate::error::{ForecastError, Result};
use crate::schema::{FeatureBlock, FeatureColumn, FeatureFamily, FeatureMatrix};
use crate::series::TimeSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Derives the full feature matrix from a series.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Run every feature family and apply the terminal fill.
    pub fn engineer(&self, series: &TimeSeries) -> Result<FeatureMatrix> {
        if series.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }

        let blocks = self.derive_blocks(series);
        let nulls: usize = blocks
            .iter()
            .flat_map(|b| b.columns.iter())
            .map(|c| c.null_count())
            .sum();

        let matrix = FeatureMatrix::from_blocks(series, blocks)?;
        info!(
            rows = matrix.len(),
            features = matrix.n_features(),
            filled_cells = nulls,
            "feature engineering complete"
        );
        Ok(matrix)
    }

    /// Derive every feature family without filling missing cells.
    ///
    /// Order: calendar, rolling, lag, difference, percent change, seasonal,
    /// holiday, trend.
    pub fn derive_blocks(&self, series: &TimeSeries) -> Vec<FeatureBlock> {
        let dates = series.dates();
        let values = series.values();

        if values.len() < 2 {
            warn!(
                rows = values.len(),
                "fewer than 2 observations; rolling std, lags and trend slopes are degenerate"
            );
        }

        let blocks = vec![
            calendar_features(dates),
            rolling_features(values, &self.config.rolling_windows),
            lag_features(values, &self.config.lag_periods),
            difference_features(values, &self.config.diff_periods),
            pct_change_features(values, &self.config.pct_change_periods),
            seasonal_ratio_features(dates, values, self.config.seasonal_ratio_epsilon),
            holiday_features(dates, &self.config.holidays),
            trend_features(values, &self.config.trend_windows),
        ];

        for block in &blocks {
            debug!(family = ?block.family, columns = block.columns.len(), "derived feature block");
        }
        blocks
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt()
        .map_or(true, |next| next.month() != date.month())
}

fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Calendar fields and boolean date flags. Day of week is Monday = 0.
pub fn calendar_features(dates: &[NaiveDate]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Calendar);
    let col = |f: &dyn Fn(NaiveDate) -> f64| dates.iter().map(|&d| f(d)).collect::<Vec<_>>();

    block.push(FeatureColumn::dense("year", col(&|d| d.year() as f64)));
    block.push(FeatureColumn::dense("month", col(&|d| d.month() as f64)));
    block.push(FeatureColumn::dense("day", col(&|d| d.day() as f64)));
    block.push(FeatureColumn::dense(
        "day_of_week",
        col(&|d| d.weekday().num_days_from_monday() as f64),
    ));
    block.push(FeatureColumn::dense("day_of_year", col(&|d| d.ordinal() as f64)));
    block.push(FeatureColumn::dense("quarter", col(&|d| quarter(d) as f64)));
    block.push(FeatureColumn::dense(
        "week_of_year",
        col(&|d| d.iso_week().week() as f64),
    ));

    block.push(FeatureColumn::dense(
        "is_weekend",
        col(&|d| flag(d.weekday().num_days_from_monday() >= 5)),
    ));
    block.push(FeatureColumn::dense(
        "is_month_start",
        col(&|d| flag(d.day() == 1)),
    ));
    block.push(FeatureColumn::dense(
        "is_month_end",
        col(&|d| flag(is_month_end(d))),
    ));
    block.push(FeatureColumn::dense(
        "is_quarter_start",
        col(&|d| flag(d.day() == 1 && matches!(d.month(), 1 | 4 | 7 | 10))),
    ));
    block.push(FeatureColumn::dense(
        "is_quarter_end",
        col(&|d| flag(is_month_end(d) && matches!(d.month(), 3 | 6 | 9 | 12))),
    ));
    block.push(FeatureColumn::dense(
        "is_year_start",
        col(&|d| flag(d.ordinal() == 1)),
    ));
    block.push(FeatureColumn::dense(
        "is_year_end",
        col(&|d| flag(d.month() == 12 && d.day() == 31)),
    ));

    block
}

/// Window of at most `window` rows ending at (and including) `i`.
fn trailing(values: &[f64], i: usize, window: usize) -> &[f64] {
    let start = (i + 1).saturating_sub(window);
    &values[start..=i]
}

/// Sample standard deviation; undefined (None) for a single observation.
fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - 1.0)).sqrt())
}

/// Rolling mean/std/min/max with a minimum-periods-of-one policy.
pub fn rolling_features(values: &[f64], windows: &[usize]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Rolling);
    let n = values.len();

    for &w in windows {
        let mut mean = Vec::with_capacity(n);
        let mut std = Vec::with_capacity(n);
        let mut min = Vec::with_capacity(n);
        let mut max = Vec::with_capacity(n);

        for i in 0..n {
            let win = trailing(values, i, w);
            mean.push(Some(win.iter().sum::<f64>() / win.len() as f64));
            std.push(sample_std(win));
            min.push(Some(win.iter().cloned().fold(f64::INFINITY, f64::min)));
            max.push(Some(win.iter().cloned().fold(f64::NEG_INFINITY, f64::max)));
        }

        block.push(FeatureColumn::new(format!("rolling_mean_{}", w), mean));
        block.push(FeatureColumn::new(format!("rolling_std_{}", w), std));
        block.push(FeatureColumn::new(format!("rolling_min_{}", w), min));
        block.push(FeatureColumn::new(format!("rolling_max_{}", w), max));
    }

    block
}

/// Value from `lag` rows earlier; None where no such row exists.
fn shifted(values: &[f64], lag: usize) -> impl Iterator<Item = Option<f64>> + '_ {
    (0..values.len()).map(move |i| i.checked_sub(lag).map(|j| values[j]))
}

/// Lag features: `lag_L[i] = value[i - L]`.
pub fn lag_features(values: &[f64], lags: &[usize]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Lag);
    for &lag in lags {
        block.push(FeatureColumn::new(
            format!("lag_{}", lag),
            shifted(values, lag).collect(),
        ));
    }
    block
}

/// First differences: `diff_k[i] = value[i] - value[i - k]`.
pub fn difference_features(values: &[f64], periods: &[usize]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Difference);
    for &k in periods {
        let col = shifted(values, k)
            .zip(values.iter())
            .map(|(prev, &v)| prev.map(|p| v - p))
            .collect();
        block.push(FeatureColumn::new(format!("diff_{}", k), col));
    }
    block
}

/// Percentage change: `value[i] / value[i - k] - 1`, None when the
/// predecessor is missing or zero.
pub fn pct_change_features(values: &[f64], periods: &[usize]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::PercentChange);
    for &k in periods {
        let col = shifted(values, k)
            .zip(values.iter())
            .map(|(prev, &v)| match prev {
                Some(p) if p != 0.0 => Some(v / p - 1.0),
                _ => None,
            })
            .collect();
        block.push(FeatureColumn::new(format!("pct_change_{}", k), col));
    }
    block
}

/// Mean value per calendar bucket over the whole series.
fn bucket_means(keys: &[u32], values: &[f64]) -> HashMap<u32, f64> {
    let mut acc: HashMap<u32, (f64, usize)> = HashMap::new();
    for (&k, &v) in keys.iter().zip(values) {
        let e = acc.entry(k).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect()
}

/// Seasonal ratios against month, day-of-week and quarter bucket means.
///
/// The bucket means span the entire series, including rows after the one
/// being described.
pub fn seasonal_ratio_features(
    dates: &[NaiveDate],
    values: &[f64],
    epsilon: f64,
) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Seasonal);

    let buckets: [(&str, fn(NaiveDate) -> u32); 3] = [
        ("monthly", |d| d.month()),
        ("dow", |d| d.weekday().num_days_from_monday()),
        ("quarter", quarter),
    ];

    for (prefix, key) in buckets {
        let keys: Vec<u32> = dates.iter().map(|&d| key(d)).collect();
        let means = bucket_means(&keys, values);
        let avg: Vec<f64> = keys.iter().map(|k| means[k]).collect();
        let ratio: Vec<f64> = values
            .iter()
            .zip(avg.iter())
            .map(|(v, a)| v / (a + epsilon))
            .collect();

        block.push(FeatureColumn::dense(format!("{}_avg", prefix), avg));
        block.push(FeatureColumn::dense(format!("{}_seasonality", prefix), ratio));
    }

    block
}

/// One binary column per holiday, set where (month, day) matches exactly.
pub fn holiday_features(dates: &[NaiveDate], holidays: &[Holiday]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Holiday);
    for holiday in holidays {
        block.push(FeatureColumn::dense(
            format!("is_{}", holiday.name),
            dates
                .iter()
                .map(|d| flag(d.month() == holiday.month && d.day() == holiday.day)),
        ));
    }
    block
}

/// OLS slope of value against row index; 0 with fewer than 2 points.
pub fn ols_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean: f64 = values.iter().sum::<f64>() / n;

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        ss_xy += (x - x_mean) * (y - y_mean);
        ss_xx += (x - x_mean).powi(2);
    }

    if ss_xx.abs() > f64::EPSILON {
        ss_xy / ss_xx
    } else {
        0.0
    }
}

/// Trend slopes over the most recent `w` rows (or all rows so far).
pub fn trend_features(values: &[f64], windows: &[usize]) -> FeatureBlock {
    let mut block = FeatureBlock::new(FeatureFamily::Trend);
    for &w in windows {
        block.push(FeatureColumn::dense(
            format!("trend_{}", w),
            (0..values.len()).map(|i| ols_slope(trailing(values, i, w))),
        ));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeriesPoint;
    use approx::assert_relative_eq;

    fn daily(start: NaiveDate, values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| TimeSeriesPoint::new(start + chrono::Days::new(i as u64), v))
                .collect(),
        )
        .unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_fields() {
        // 2024-03-31 is a Sunday, end of month and quarter
        let block = calendar_features(&[ymd(2024, 3, 31), ymd(2024, 4, 1)]);
        let get = |name: &str| block.column(name).unwrap().values.clone();

        assert_eq!(get("day_of_week"), vec![Some(6.0), Some(0.0)]);
        assert_eq!(get("is_weekend"), vec![Some(1.0), Some(0.0)]);
        assert_eq!(get("is_month_end"), vec![Some(1.0), Some(0.0)]);
        assert_eq!(get("is_quarter_end"), vec![Some(1.0), Some(0.0)]);
        assert_eq!(get("is_quarter_start"), vec![Some(0.0), Some(1.0)]);
        assert_eq!(get("quarter"), vec![Some(1.0), Some(2.0)]);
        assert_eq!(get("day_of_year"), vec![Some(91.0), Some(92.0)]);
        assert_eq!(get("week_of_year"), vec![Some(13.0), Some(14.0)]);
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // 2021-01-01 belongs to ISO week 53 of 2020
        let block = calendar_features(&[ymd(2021, 1, 1)]);
        assert_eq!(block.column("week_of_year").unwrap().values, vec![Some(53.0)]);
        assert_eq!(block.column("is_year_start").unwrap().values, vec![Some(1.0)]);
    }

    #[test]
    fn test_rolling_first_row_equals_value() {
        let values = [4.0, 8.0, 6.0, 2.0];
        let block = rolling_features(&values, &[3]);
        assert_eq!(block.column("rolling_mean_3").unwrap().values[0], Some(4.0));
        assert_eq!(block.column("rolling_min_3").unwrap().values[0], Some(4.0));
        assert_eq!(block.column("rolling_max_3").unwrap().values[0], Some(4.0));
        assert_eq!(block.column("rolling_std_3").unwrap().values[0], None);
    }

    #[test]
    fn test_rolling_min_periods_and_window() {
        let values = [4.0, 8.0, 6.0, 2.0];
        let block = rolling_features(&values, &[3]);
        let mean = &block.column("rolling_mean_3").unwrap().values;
        assert_relative_eq!(mean[1].unwrap(), 6.0);
        assert_relative_eq!(mean[3].unwrap(), (8.0 + 6.0 + 2.0) / 3.0);

        let std = &block.column("rolling_std_3").unwrap().values;
        // sample std of [4, 8]
        assert_relative_eq!(std[1].unwrap(), 8.0_f64.sqrt(), epsilon = 1e-12);

        let max = &block.column("rolling_max_3").unwrap().values;
        assert_eq!(max[3], Some(8.0));
    }

    #[test]
    fn test_lag_longer_than_series_is_all_null() {
        let values = [1.0, 2.0, 3.0];
        let block = lag_features(&values, &[3, 10]);
        for col in &block.columns {
            assert!(col.values.iter().all(|v| v.is_none()), "{}", col.name);
        }
    }

    #[test]
    fn test_lag_diff_pct() {
        let values = [10.0, 0.0, 5.0, 20.0];
        let lags = lag_features(&values, &[1]);
        assert_eq!(
            lags.column("lag_1").unwrap().values,
            vec![None, Some(10.0), Some(0.0), Some(5.0)]
        );

        let diffs = difference_features(&values, &[2]);
        assert_eq!(
            diffs.column("diff_2").unwrap().values,
            vec![None, None, Some(-5.0), Some(20.0)]
        );

        let pct = pct_change_features(&values, &[1]);
        let col = &pct.column("pct_change_1").unwrap().values;
        assert_eq!(col[0], None);
        assert_eq!(col[1], Some(-1.0));
        // predecessor is zero
        assert_eq!(col[2], None);
        assert_eq!(col[3], Some(3.0));
    }

    #[test]
    fn test_seasonal_ratio_uses_whole_series_means() {
        // Two Januaries and one February
        let dates = [ymd(2023, 1, 1), ymd(2023, 1, 2), ymd(2023, 2, 1)];
        let values = [10.0, 30.0, 50.0];
        let block = seasonal_ratio_features(&dates, &values, 0.0);

        assert_eq!(
            block.column("monthly_avg").unwrap().values,
            vec![Some(20.0), Some(20.0), Some(50.0)]
        );
        let ratio = &block.column("monthly_seasonality").unwrap().values;
        assert_relative_eq!(ratio[0].unwrap(), 0.5);
        assert_relative_eq!(ratio[1].unwrap(), 1.5);
        assert_relative_eq!(ratio[2].unwrap(), 1.0);
        assert_eq!(
            block.column("quarter_avg").unwrap().values,
            vec![Some(30.0), Some(30.0), Some(30.0)]
        );
    }

    #[test]
    fn test_christmas_once_per_year() {
        let start = ymd(2020, 1, 1);
        let dates: Vec<NaiveDate> = (0..(366 + 365 + 365))
            .map(|i| start + chrono::Days::new(i))
            .collect();
        let block = holiday_features(&dates, &[Holiday::new("christmas", 12, 25)]);
        let col = &block.column("is_christmas").unwrap().values;

        for year in 2020..=2022 {
            let hits = dates
                .iter()
                .zip(col.iter())
                .filter(|(d, v)| d.year() == year && **v == Some(1.0))
                .count();
            assert_eq!(hits, 1, "year {}", year);
        }
        let total: f64 = col.iter().map(|v| v.unwrap()).sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_trend_slope() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let block = trend_features(&values, &[7]);
        let col = &block.column("trend_7").unwrap().values;
        assert_eq!(col[0], Some(0.0));
        assert_relative_eq!(col[1].unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(col[9].unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(ols_slope(&[5.0]), 0.0);
    }

    #[test]
    fn test_engineer_full_matrix() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let series = daily(ymd(2023, 1, 1), &values);
        let engineer = FeatureEngineer::default();
        let matrix = engineer.engineer(&series).unwrap();

        assert_eq!(matrix.len(), 60);
        // 14 calendar + 20 rolling + 5 lag + 3 diff + 3 pct + 6 seasonal + 7 holiday + 3 trend
        assert_eq!(matrix.n_features(), 61);

        // lag_1 warm-up row is back-filled from the first real lag value
        assert_eq!(matrix.column("lag_1").unwrap()[0], 100.0);
        // lag_365 never exists in a 60-day series and ends up zero
        assert!(matrix.column("lag_365").unwrap().iter().all(|&v| v == 0.0));
        // rolling std of the first row takes the second row's value
        let std = matrix.column("rolling_std_7").unwrap();
        assert_relative_eq!(std[0], std[1]);
        assert_eq!(matrix.row(0).unwrap().get("is_new_year"), Some(1.0));
    }

    #[test]
    fn test_engineer_single_point_degrades() {
        let series = daily(ymd(2023, 1, 1), &[42.0]);
        let matrix = FeatureEngineer::default().engineer(&series).unwrap();
        assert_eq!(matrix.column("rolling_mean_7").unwrap(), &[42.0]);
        assert_eq!(matrix.column("rolling_std_7").unwrap(), &[0.0]);
        assert_eq!(matrix.column("trend_30").unwrap(), &[0.0]);
    }

    #[test]
    fn test_engineer_empty_series_fails() {
        let series = TimeSeries::new(vec![]).unwrap();
        assert!(matches!(
            FeatureEngineer::default().engineer(&series),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
