//! Descriptive profile of a raw trip table.
//!
//! Statistics follow the usual dataframe conventions: sample standard deviation,
//! bias-corrected skew and excess kurtosis, linearly interpolated quartiles.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::outputs::records_to_dataframe;
use crate::types::TripRecord;

const LONG_TRIP_SECONDS: f64 = 3600.0;
const SHORT_TRIP_SECONDS: f64 = 300.0;
const IQR_FACTOR: f64 = 1.5;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum ExplorationError {
    #[error("cannot explore an empty table")]
    Empty,
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Serialize)]
pub struct BasicInfo {
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, String>,
    pub missing_values: BTreeMap<String, usize>,
    pub memory_usage_mb: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub skew: Option<f64>,
    pub kurtosis: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatetimeSummary {
    pub min_date: NaiveDateTime,
    pub max_date: NaiveDateTime,
    pub date_range_days: i64,
    pub common_hours: BTreeMap<u32, usize>,
    pub common_days: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripCharacteristics {
    pub avg_trip_duration_minutes: Option<f64>,
    pub passenger_distribution: BTreeMap<i64, usize>,
    pub long_trips: usize,
    pub short_trips: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierSummary {
    pub total_outliers: usize,
    pub outlier_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorationReport {
    pub basic_info: BasicInfo,
    pub numeric_analysis: BTreeMap<String, NumericSummary>,
    pub datetime_analysis: BTreeMap<String, DatetimeSummary>,
    pub trip_characteristics: TripCharacteristics,
    pub outlier_analysis: BTreeMap<String, OutlierSummary>,
    pub report_generated_at: DateTime<Utc>,
}

pub fn raw_to_dataframe(records: &[TripRecord]) -> PolarsResult<DataFrame> {
    records_to_dataframe(records)
}

pub fn explore(df: &DataFrame) -> Result<ExplorationReport, ExplorationError> {
    if df.height() == 0 {
        return Err(ExplorationError::Empty);
    }
    info!(rows = df.height(), "Generating exploration report");

    let mut numeric_analysis = BTreeMap::new();
    let mut outlier_analysis = BTreeMap::new();
    let mut datetime_analysis = BTreeMap::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        if is_numeric(column.dtype()) {
            let values = float_values(column)?;
            if let Some(summary) = summarize(&values) {
                numeric_analysis.insert(name.clone(), summary);
            }
            if let Some(outliers) = iqr_outliers(&values, df.height()) {
                outlier_analysis.insert(name, outliers);
            }
        } else if let DataType::Datetime(unit, _) = column.dtype() {
            let stamps = datetime_values(column, *unit)?;
            if let Some(summary) = summarize_datetimes(&stamps) {
                datetime_analysis.insert(name, summary);
            }
        }
    }

    let report = ExplorationReport {
        basic_info: basic_info(df),
        numeric_analysis,
        datetime_analysis,
        trip_characteristics: trip_characteristics(df)?,
        outlier_analysis,
        report_generated_at: Utc::now(),
    };
    info!("Report generation completed");
    Ok(report)
}

fn basic_info(df: &DataFrame) -> BasicInfo {
    let columns = df.get_columns();
    BasicInfo {
        total_rows: df.height(),
        columns: columns.iter().map(|c| c.name().to_string()).collect(),
        dtypes: columns
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .collect(),
        missing_values: columns
            .iter()
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect(),
        memory_usage_mb: df.estimated_size() as f64 / BYTES_PER_MB,
    }
}

fn trip_characteristics(df: &DataFrame) -> Result<TripCharacteristics, ExplorationError> {
    let durations = match df.column("trip_duration") {
        Ok(column) => float_values(column)?,
        Err(_) => Vec::new(),
    };
    let mut passenger_distribution = BTreeMap::new();
    if let Ok(column) = df.column("passenger_count") {
        let counts = column.cast(&DataType::Int64)?;
        for count in counts.i64()?.into_iter().flatten() {
            *passenger_distribution.entry(count).or_insert(0) += 1;
        }
    }

    Ok(TripCharacteristics {
        avg_trip_duration_minutes: mean(&durations).map(|m| m / 60.0),
        passenger_distribution,
        long_trips: durations.iter().filter(|d| **d > LONG_TRIP_SECONDS).count(),
        short_trips: durations.iter().filter(|d| **d < SHORT_TRIP_SECONDS).count(),
    })
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Non-null values as `f64`, nulls dropped.
fn float_values(column: &Column) -> PolarsResult<Vec<f64>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().flatten().collect())
}

fn datetime_values(column: &Column, unit: TimeUnit) -> PolarsResult<Vec<NaiveDateTime>> {
    let raw = column.cast(&DataType::Int64)?;
    Ok(raw
        .i64()?
        .into_iter()
        .flatten()
        .filter_map(|value| {
            let stamp = match unit {
                TimeUnit::Nanoseconds => DateTime::from_timestamp_nanos(value),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(value)?,
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value)?,
            };
            Some(stamp.naive_utc())
        })
        .collect())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear interpolation between closest ranks. `sorted` must be ascending.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn summarize(values: &[f64]) -> Option<NumericSummary> {
    let mean = mean(values)?;
    let sorted = sorted(values);
    let n = values.len() as f64;

    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for value in values {
        let d = value - mean;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }

    let std = (values.len() > 1).then(|| (m2 / (n - 1.0)).sqrt());
    let skew = (values.len() > 2).then(|| {
        if m2 == 0.0 {
            return 0.0;
        }
        let (m2, m3) = (m2 / n, m3 / n);
        (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
    });
    let kurtosis = (values.len() > 3).then(|| {
        if m2 == 0.0 {
            return 0.0;
        }
        let numerator = n * (n + 1.0) * (n - 1.0) * m4;
        let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
        let adjustment = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
        numerator / denominator - adjustment
    });

    Some(NumericSummary {
        mean,
        median: quantile(&sorted, 0.5)?,
        std,
        min: *sorted.first()?,
        max: *sorted.last()?,
        skew,
        kurtosis,
    })
}

fn iqr_outliers(values: &[f64], total_rows: usize) -> Option<OutlierSummary> {
    let sorted = sorted(values);
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let (low, high) = (q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr);

    let total_outliers = values.iter().filter(|v| **v < low || **v > high).count();
    Some(OutlierSummary {
        total_outliers,
        outlier_percentage: total_outliers as f64 / total_rows as f64 * 100.0,
    })
}

fn summarize_datetimes(stamps: &[NaiveDateTime]) -> Option<DatetimeSummary> {
    let min_date = *stamps.iter().min()?;
    let max_date = *stamps.iter().max()?;

    let mut common_hours = BTreeMap::new();
    let mut common_days = BTreeMap::new();
    for stamp in stamps {
        *common_hours.entry(stamp.hour()).or_insert(0) += 1;
        *common_days.entry(stamp.format("%A").to_string()).or_insert(0) += 1;
    }

    Some(DatetimeSummary {
        min_date,
        max_date,
        date_range_days: (max_date - min_date).num_days(),
        common_hours,
        common_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate_between_ranks() {
        let values = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
    }

    #[test]
    fn summary_matches_sample_moments() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0, 10.0]).unwrap();
        assert!((summary.mean - 4.0).abs() < 1e-12);
        assert!((summary.median - 3.0).abs() < 1e-12);
        // sample variance = 50 / 4
        assert!((summary.std.unwrap() - 12.5f64.sqrt()).abs() < 1e-12);
        assert!(summary.skew.unwrap() > 0.0);
        assert!(summary.kurtosis.is_some());
    }

    #[test]
    fn constant_column_has_zero_shape() {
        let summary = summarize(&[2.0; 5]).unwrap();
        assert_eq!(summary.std, Some(0.0));
        assert_eq!(summary.skew, Some(0.0));
        assert_eq!(summary.kurtosis, Some(0.0));
    }

    #[test]
    fn iqr_flags_the_far_value() {
        let outliers = iqr_outliers(&[1.0, 2.0, 3.0, 4.0, 100.0], 5).unwrap();
        assert_eq!(outliers.total_outliers, 1);
        assert!((outliers.outlier_percentage - 20.0).abs() < 1e-12);
    }
}
