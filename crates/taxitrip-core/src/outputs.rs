use std::io::Write;
use std::path::Path;

use polars::io::parquet::write::ParquetWriter;
use polars::prelude::*;

use crate::types::{EnrichedTrip, TripRecord};

/// File formats the enriched frame can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(OutputFormat::Csv),
            "parquet" => Some(OutputFormat::Parquet),
            "json" | "ndjson" | "jsonl" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

fn timestamp_series(name: &str, values: impl Iterator<Item = i64>) -> PolarsResult<Series> {
    Series::new(name.into(), values.collect::<Vec<_>>())
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
}

fn record_columns(records: &[&TripRecord]) -> PolarsResult<Vec<Column>> {
    let micros = |f: fn(&TripRecord) -> i64| records.iter().map(move |r| f(r));

    Ok(vec![
        Series::new(
            "id".into(),
            records.iter().map(|r| r.id.as_deref()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "vendor_id".into(),
            records.iter().map(|r| r.vendor_id.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        timestamp_series(
            "pickup_datetime",
            micros(|r| r.pickup_datetime.and_utc().timestamp_micros()),
        )?
        .into(),
        timestamp_series(
            "dropoff_datetime",
            micros(|r| r.dropoff_datetime.and_utc().timestamp_micros()),
        )?
        .into(),
        Series::new(
            "passenger_count".into(),
            records.iter().map(|r| r.passenger_count).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "pickup_longitude".into(),
            records.iter().map(|r| r.pickup_longitude).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "pickup_latitude".into(),
            records.iter().map(|r| r.pickup_latitude).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "dropoff_longitude".into(),
            records.iter().map(|r| r.dropoff_longitude).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "dropoff_latitude".into(),
            records.iter().map(|r| r.dropoff_latitude).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "store_and_fwd_flag".into(),
            records
                .iter()
                .map(|r| r.store_and_fwd_flag.as_deref())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "trip_duration".into(),
            records.iter().map(|r| r.trip_duration).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Raw records as a frame, one column per input field.
pub fn records_to_dataframe(records: &[TripRecord]) -> PolarsResult<DataFrame> {
    let refs: Vec<&TripRecord> = records.iter().collect();
    DataFrame::new(record_columns(&refs)?)
}

/// Input columns followed by the derived feature columns.
pub fn enriched_to_dataframe(trips: &[EnrichedTrip]) -> PolarsResult<DataFrame> {
    let records: Vec<&TripRecord> = trips.iter().map(|t| &t.record).collect();
    let mut df = DataFrame::new(record_columns(&records)?)?;

    let features = trips.iter().map(|t| &t.features);
    df.hstack_mut(&[
        Series::new(
            "pickup_hour".into(),
            features.clone().map(|f| f.pickup_hour as i32).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "pickup_day".into(),
            features.clone().map(|f| f.pickup_day.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "pickup_month".into(),
            features.clone().map(|f| f.pickup_month as i32).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "pickup_dayofweek".into(),
            features
                .clone()
                .map(|f| f.pickup_dayofweek as i32)
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "is_rush_hour".into(),
            features.clone().map(|f| f.is_rush_hour).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "is_weekend".into(),
            features.clone().map(|f| f.is_weekend).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "trip_distance".into(),
            features.clone().map(|f| f.trip_distance).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "average_speed".into(),
            features.clone().map(|f| f.average_speed).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "time_category".into(),
            features
                .map(|f| f.time_category.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
    ])?;

    Ok(df)
}

pub fn write_dataframe<W: Write>(
    df: &mut DataFrame,
    writer: &mut W,
    format: OutputFormat,
) -> PolarsResult<()> {
    match format {
        OutputFormat::Csv => CsvWriter::new(writer).include_header(true).finish(df),
        OutputFormat::Parquet => {
            ParquetWriter::new(writer).finish(df)?;
            Ok(())
        }
        OutputFormat::Json => JsonWriter::new(writer)
            .with_json_format(JsonFormat::JsonLines)
            .finish(df),
    }
}
