use serde_json::{Map, Value};

use crate::errors::SchemaError;
use crate::model::TripRecord;

use super::schema::{OPTIONAL_COLUMNS, REQUIRED_COLUMNS};
use super::{is_missing, parse_timestamp};

/// One JSON object per line, keyed by column name. Blank lines are skipped.
pub fn parse_trip_json_lines(content: &str) -> Result<Vec<TripRecord>, SchemaError> {
    let mut records = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let line = idx + 1;
        let value: Value =
            serde_json::from_str(raw).map_err(|source| SchemaError::Json { line, source })?;
        records.push(TripRecord::from_json(&value, line)?);
    }
    Ok(records)
}

impl TripRecord {
    /// Builds a record from a field-name to value mapping.
    ///
    /// `line` is only used to label errors.
    pub fn from_json(value: &Value, line: usize) -> Result<Self, SchemaError> {
        let object = value
            .as_object()
            .ok_or(SchemaError::NotAnObject { line })?;
        let [vendor, pickup, dropoff, passengers, pickup_lon, pickup_lat, dropoff_lon, dropoff_lat, duration] =
            REQUIRED_COLUMNS;
        let [id, store_and_fwd_flag] = OPTIONAL_COLUMNS;

        let passenger_count = json_i64(object, passengers, line)?;
        let passenger_count =
            i32::try_from(passenger_count).map_err(|_| SchemaError::InvalidField {
                line,
                field: passengers,
                value: passenger_count.to_string(),
                expected: "32-bit integer",
            })?;

        Ok(TripRecord {
            id: json_optional_string(object, id),
            vendor_id: json_identifier(object, vendor, line)?,
            pickup_datetime: parse_timestamp(pickup, json_str(object, pickup, line)?, line)?,
            dropoff_datetime: parse_timestamp(dropoff, json_str(object, dropoff, line)?, line)?,
            passenger_count,
            pickup_longitude: json_f64(object, pickup_lon, line)?,
            pickup_latitude: json_f64(object, pickup_lat, line)?,
            dropoff_longitude: json_f64(object, dropoff_lon, line)?,
            dropoff_latitude: json_f64(object, dropoff_lat, line)?,
            store_and_fwd_flag: json_optional_string(object, store_and_fwd_flag),
            trip_duration: json_i64(object, duration, line)?,
        })
    }
}

fn present<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
    line: usize,
) -> Result<&'a Value, SchemaError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(SchemaError::MissingField { line, field }),
        Some(value) => Ok(value),
    }
}

fn invalid(field: &'static str, value: &Value, line: usize, expected: &'static str) -> SchemaError {
    SchemaError::InvalidField {
        line,
        field,
        value: value.to_string(),
        expected,
    }
}

fn json_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
    line: usize,
) -> Result<&'a str, SchemaError> {
    let value = present(object, field, line)?;
    value
        .as_str()
        .ok_or_else(|| invalid(field, value, line, "string"))
}

fn json_identifier(
    object: &Map<String, Value>,
    field: &'static str,
    line: usize,
) -> Result<String, SchemaError> {
    let value = present(object, field, line)?;
    match value {
        Value::String(s) if !is_missing(s) => Ok(s.trim().to_string()),
        Value::String(_) => Err(SchemaError::MissingField { line, field }),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        other => Err(invalid(field, other, line, "string or integer")),
    }
}

fn json_i64(object: &Map<String, Value>, field: &'static str, line: usize) -> Result<i64, SchemaError> {
    let value = present(object, field, line)?;
    value
        .as_i64()
        .ok_or_else(|| invalid(field, value, line, "integer"))
}

fn json_f64(object: &Map<String, Value>, field: &'static str, line: usize) -> Result<f64, SchemaError> {
    let value = present(object, field, line)?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, value, line, "number"))
}

fn json_optional_string(object: &Map<String, Value>, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::String(s) if !is_missing(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
