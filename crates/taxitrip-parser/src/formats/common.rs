use chrono::NaiveDateTime;
use csv::StringRecord;

use crate::errors::SchemaError;
use crate::model::TripRecord;

use super::schema::{ColumnIndex, OPTIONAL_COLUMNS, REQUIRED_COLUMNS, TIMESTAMP_FORMATS};

pub(crate) fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("null")
}

pub(crate) fn parse_timestamp(
    field: &'static str,
    value: &str,
    line: usize,
) -> Result<NaiveDateTime, SchemaError> {
    if is_missing(value) {
        return Err(SchemaError::MissingField { line, field });
    }
    let trimmed = value.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }
    Err(SchemaError::InvalidField {
        line,
        field,
        value: trimmed.to_string(),
        expected: "timestamp",
    })
}

pub(crate) fn parse_required_i64(
    field: &'static str,
    value: &str,
    line: usize,
) -> Result<i64, SchemaError> {
    if is_missing(value) {
        return Err(SchemaError::MissingField { line, field });
    }
    let trimmed = value.trim();
    trimmed.parse::<i64>().map_err(|_| SchemaError::InvalidField {
        line,
        field,
        value: trimmed.to_string(),
        expected: "integer",
    })
}

pub(crate) fn parse_required_i32(
    field: &'static str,
    value: &str,
    line: usize,
) -> Result<i32, SchemaError> {
    let wide = parse_required_i64(field, value, line)?;
    i32::try_from(wide).map_err(|_| SchemaError::InvalidField {
        line,
        field,
        value: wide.to_string(),
        expected: "32-bit integer",
    })
}

pub(crate) fn parse_required_f64(
    field: &'static str,
    value: &str,
    line: usize,
) -> Result<f64, SchemaError> {
    if is_missing(value) {
        return Err(SchemaError::MissingField { line, field });
    }
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(SchemaError::InvalidField {
            line,
            field,
            value: trimmed.to_string(),
            expected: "finite float",
        }),
    }
}

pub(crate) fn parse_required_str(
    field: &'static str,
    value: &str,
    line: usize,
) -> Result<String, SchemaError> {
    if is_missing(value) {
        return Err(SchemaError::MissingField { line, field });
    }
    Ok(value.trim().to_string())
}

fn optional_str(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !is_missing(v))
        .map(|v| v.trim().to_string())
}

/// True when at least one header cell is a required trip column.
pub(crate) fn names_trip_column(header: &StringRecord) -> bool {
    header.iter().any(|h| {
        REQUIRED_COLUMNS
            .iter()
            .any(|column| h.trim().eq_ignore_ascii_case(column))
    })
}

/// Maps header names to positions. Fails on the first required column that is absent.
pub(crate) fn index_columns(header: &StringRecord) -> Result<ColumnIndex, SchemaError> {
    let position = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let mut required = [0usize; 9];
    for (slot, column) in required.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = position(column).ok_or(SchemaError::MissingColumn { column })?;
    }

    let [id, store_and_fwd_flag] = OPTIONAL_COLUMNS;
    Ok(ColumnIndex {
        required,
        id: position(id),
        store_and_fwd_flag: position(store_and_fwd_flag),
    })
}

pub(crate) fn record_from_row(
    columns: &ColumnIndex,
    row: &StringRecord,
    line: usize,
) -> Result<TripRecord, SchemaError> {
    let field = |idx: usize| row.get(columns.required[idx]).unwrap_or("");
    let [vendor, pickup, dropoff, passengers, pickup_lon, pickup_lat, dropoff_lon, dropoff_lat, duration] =
        REQUIRED_COLUMNS;

    Ok(TripRecord {
        id: optional_str(columns.id.and_then(|idx| row.get(idx))),
        vendor_id: parse_required_str(vendor, field(0), line)?,
        pickup_datetime: parse_timestamp(pickup, field(1), line)?,
        dropoff_datetime: parse_timestamp(dropoff, field(2), line)?,
        passenger_count: parse_required_i32(passengers, field(3), line)?,
        pickup_longitude: parse_required_f64(pickup_lon, field(4), line)?,
        pickup_latitude: parse_required_f64(pickup_lat, field(5), line)?,
        dropoff_longitude: parse_required_f64(dropoff_lon, field(6), line)?,
        dropoff_latitude: parse_required_f64(dropoff_lat, field(7), line)?,
        store_and_fwd_flag: optional_str(columns.store_and_fwd_flag.and_then(|idx| row.get(idx))),
        trip_duration: parse_required_i64(duration, field(8), line)?,
    })
}
