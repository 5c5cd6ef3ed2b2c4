use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::json;

use crate::errors::SchemaError;
use crate::formats::{parse_trip_json_lines, TripCsvReader};
use crate::model::TripRecord;
use crate::{parse_trip_csv, parse_trip_file, InputFormat};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

const HEADER: &str = "vendor_id,pickup_datetime,dropoff_datetime,passenger_count,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,trip_duration";

#[test]
fn parses_dataset_sample() {
    let content = fixture("trips_sample.csv");
    let records = parse_trip_csv(&content).expect("sample parse failed");

    assert_eq!(records.len(), 10);

    let first = &records[0];
    assert_eq!(first.id.as_deref(), Some("id2875421"));
    assert_eq!(first.vendor_id, "2");
    assert_eq!(
        first.pickup_datetime,
        NaiveDate::from_ymd_opt(2016, 3, 14)
            .unwrap()
            .and_hms_opt(17, 24, 55)
            .unwrap()
    );
    assert_eq!(first.passenger_count, 1);
    assert_eq!(first.trip_duration, 455);
    assert_eq!(first.store_and_fwd_flag.as_deref(), Some("N"));
    assert!((first.pickup_latitude - 40.767936706542969).abs() < 1e-12);
}

#[test]
fn column_order_is_free_and_optional_columns_may_be_absent() {
    let content = "\
trip_duration,dropoff_latitude,dropoff_longitude,pickup_latitude,pickup_longitude,passenger_count,dropoff_datetime,pickup_datetime,vendor_id
1800,40.7668,-73.9831,40.7589,-73.9851,2,2016-01-01T00:30:00,2016-01-01T00:00:00,1
";
    let records = parse_trip_csv(content).expect("reordered header should parse");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.id.is_none());
    assert_eq!(record.trip_duration, 1800);
    assert_eq!(record.passenger_count, 2);
    assert_eq!(record.pickup(), (40.7589, -73.9851));
    assert_eq!(record.dropoff(), (40.7668, -73.9831));
}

#[test]
fn missing_required_column_fails_before_rows() {
    let content = "\
vendor_id,pickup_datetime,dropoff_datetime,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,trip_duration
1,2016-01-01 00:00:00,2016-01-01 00:30:00,-73.9851,40.7589,-73.9831,40.7668,1800
";
    let err = parse_trip_csv(content).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::MissingColumn {
            column: "passenger_count"
        }
    ));
}

#[test]
fn wrong_type_reports_line_and_field() {
    let content = format!(
        "{HEADER}\n\
1,2016-01-01 00:00:00,2016-01-01 00:30:00,2,-73.9851,40.7589,-73.9831,40.7668,1800\n\
1,2016-01-01 00:00:00,2016-01-01 00:30:00,two,-73.9851,40.7589,-73.9831,40.7668,1800\n"
    );
    match parse_trip_csv(&content).unwrap_err() {
        SchemaError::InvalidField {
            line,
            field,
            value,
            expected,
        } => {
            assert_eq!(line, 3);
            assert_eq!(field, "passenger_count");
            assert_eq!(value, "two");
            assert_eq!(expected, "integer");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_required_value_is_missing_field() {
    let content = format!(
        "{HEADER}\n1,2016-01-01 00:00:00,,2,-73.9851,40.7589,-73.9831,40.7668,1800\n"
    );
    let err = parse_trip_csv(&content).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::MissingField {
            line: 2,
            field: "dropoff_datetime"
        }
    ));
}

#[test]
fn bad_timestamp_is_invalid_field() {
    let content = format!(
        "{HEADER}\n1,01/01/2016 00:00,2016-01-01 00:30:00,2,-73.9851,40.7589,-73.9831,40.7668,1800\n"
    );
    let err = parse_trip_csv(&content).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::InvalidField {
            field: "pickup_datetime",
            expected: "timestamp",
            ..
        }
    ));
}

#[test]
fn header_only_file_is_an_empty_batch() {
    let content = format!("{HEADER}\n");
    assert!(parse_trip_csv(&content).unwrap().is_empty());
    assert!(parse_trip_file(&content).unwrap().is_empty());

    let mut reader = TripCsvReader::new(content.as_bytes(), 4).unwrap();
    assert!(reader.next_chunk().unwrap().is_none());
}

#[test]
fn blank_input_is_an_empty_batch() {
    assert_eq!(InputFormat::detect("\n  \n").unwrap(), None);
    assert!(parse_trip_file("").unwrap().is_empty());
    assert!(parse_trip_json_lines("\n\n").unwrap().is_empty());
}

#[test]
fn optional_columns_are_found_by_name() {
    let content = "\
STORE_AND_FWD_FLAG,vendor_id,pickup_datetime,dropoff_datetime,passenger_count,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,trip_duration,Id
Y,1,2016-01-01 00:00:00,2016-01-01 00:30:00,2,-73.9851,40.7589,-73.9831,40.7668,1800,id0000042
";
    let records = parse_trip_csv(content).unwrap();
    assert_eq!(records[0].id.as_deref(), Some("id0000042"));
    assert_eq!(records[0].store_and_fwd_flag.as_deref(), Some("Y"));

    let value = json!({
        "id": "id0000043",
        "store_and_fwd_flag": "N",
        "vendor_id": "1",
        "pickup_datetime": "2016-01-01 00:00:00",
        "dropoff_datetime": "2016-01-01 00:30:00",
        "passenger_count": 2,
        "pickup_latitude": 40.7589,
        "pickup_longitude": -73.9851,
        "dropoff_latitude": 40.7668,
        "dropoff_longitude": -73.9831,
        "trip_duration": 1800
    });
    let record = TripRecord::from_json(&value, 1).unwrap();
    assert_eq!(record.id.as_deref(), Some("id0000043"));
    assert_eq!(record.store_and_fwd_flag.as_deref(), Some("N"));
}

#[test]
fn chunked_reader_respects_chunk_size() {
    let content = fixture("trips_sample.csv");
    let mut reader = TripCsvReader::new(content.as_bytes(), 4).expect("header should parse");

    let sizes: Vec<usize> = std::iter::from_fn(|| reader.next_chunk().transpose())
        .map(|chunk| chunk.expect("chunk should parse").len())
        .collect();

    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(reader.rows_read(), 10);
}

#[test]
fn json_object_maps_to_record() {
    let value = json!({
        "vendor_id": "1",
        "pickup_datetime": "2016-01-01T00:00:00",
        "dropoff_datetime": "2016-01-01T00:30:00",
        "passenger_count": 2,
        "pickup_latitude": 40.7589,
        "pickup_longitude": -73.9851,
        "dropoff_latitude": 40.7668,
        "dropoff_longitude": -73.9831,
        "trip_duration": 1800
    });

    let record = TripRecord::from_json(&value, 1).expect("object should convert");
    assert_eq!(record.vendor_id, "1");
    assert_eq!(record.passenger_count, 2);
    assert_eq!(record.trip_duration, 1800);
    assert_eq!(
        record.dropoff_datetime,
        NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap()
    );
}

#[test]
fn json_numeric_vendor_id_is_accepted() {
    let value = json!({
        "vendor_id": 2,
        "pickup_datetime": "2016-01-01 00:00:00",
        "dropoff_datetime": "2016-01-01 00:30:00",
        "passenger_count": 1,
        "pickup_latitude": 40.75,
        "pickup_longitude": -73.98,
        "dropoff_latitude": 40.76,
        "dropoff_longitude": -73.97,
        "trip_duration": 1800
    });
    let record = TripRecord::from_json(&value, 1).unwrap();
    assert_eq!(record.vendor_id, "2");
}

#[test]
fn json_wrong_type_and_missing_field_are_schema_errors() {
    let wrong_type = json!({
        "vendor_id": "1",
        "pickup_datetime": "2016-01-01 00:00:00",
        "dropoff_datetime": "2016-01-01 00:30:00",
        "passenger_count": "2",
        "pickup_latitude": 40.75,
        "pickup_longitude": -73.98,
        "dropoff_latitude": 40.76,
        "dropoff_longitude": -73.97,
        "trip_duration": 1800
    });
    assert!(matches!(
        TripRecord::from_json(&wrong_type, 4),
        Err(SchemaError::InvalidField {
            line: 4,
            field: "passenger_count",
            ..
        })
    ));

    let missing = json!({
        "vendor_id": "1",
        "pickup_datetime": "2016-01-01 00:00:00",
        "dropoff_datetime": "2016-01-01 00:30:00",
        "passenger_count": 2,
        "pickup_latitude": 40.75,
        "pickup_longitude": -73.98,
        "dropoff_latitude": 40.76,
        "dropoff_longitude": -73.97
    });
    assert!(matches!(
        TripRecord::from_json(&missing, 1),
        Err(SchemaError::MissingField {
            field: "trip_duration",
            ..
        })
    ));

    let fractional_duration = json!({
        "vendor_id": "1",
        "pickup_datetime": "2016-01-01 00:00:00",
        "dropoff_datetime": "2016-01-01 00:30:00",
        "passenger_count": 2,
        "pickup_latitude": 40.75,
        "pickup_longitude": -73.98,
        "dropoff_latitude": 40.76,
        "dropoff_longitude": -73.97,
        "trip_duration": 1800.5
    });
    assert!(TripRecord::from_json(&fractional_duration, 1).is_err());

    assert!(matches!(
        TripRecord::from_json(&json!([1, 2, 3]), 9),
        Err(SchemaError::NotAnObject { line: 9 })
    ));
}

#[test]
fn json_lines_skip_blank_lines() {
    let content = r#"
{"vendor_id":"1","pickup_datetime":"2016-01-01 00:00:00","dropoff_datetime":"2016-01-01 00:30:00","passenger_count":2,"pickup_latitude":40.7589,"pickup_longitude":-73.9851,"dropoff_latitude":40.7668,"dropoff_longitude":-73.9831,"trip_duration":1800}

{"vendor_id":"2","pickup_datetime":"2016-01-02 08:00:00","dropoff_datetime":"2016-01-02 08:10:00","passenger_count":1,"pickup_latitude":40.75,"pickup_longitude":-73.98,"dropoff_latitude":40.76,"dropoff_longitude":-73.97,"trip_duration":600}
"#;
    let records = parse_trip_json_lines(content).expect("json lines should parse");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].vendor_id, "2");
}

#[test]
fn detects_format_from_first_line() {
    assert_eq!(
        InputFormat::detect(&fixture("trips_sample.csv")).unwrap(),
        Some(InputFormat::Csv)
    );
    assert_eq!(
        InputFormat::detect("\n  {\"vendor_id\": \"1\"}\n").unwrap(),
        Some(InputFormat::JsonLines)
    );
}

#[test]
fn parse_trip_file_dispatches_on_format() {
    let csv_records = parse_trip_file(&fixture("trips_sample.csv")).expect("csv detected");
    assert_eq!(csv_records.len(), 10);

    let jsonl = r#"{"vendor_id":"1","pickup_datetime":"2016-01-01 00:00:00","dropoff_datetime":"2016-01-01 00:30:00","passenger_count":2,"pickup_latitude":40.7589,"pickup_longitude":-73.9851,"dropoff_latitude":40.7668,"dropoff_longitude":-73.9831,"trip_duration":1800}"#;
    let json_records = parse_trip_file(jsonl).expect("json lines detected");
    assert_eq!(json_records.len(), 1);

    match parse_trip_file("foo,bar\n1,2\n").unwrap_err() {
        SchemaError::NoMatchingParser { attempts } => {
            assert_eq!(attempts.len(), 2);
            assert!(attempts[1].message.contains("does not name any trip column"));
            assert_eq!(attempts[0].parser, "JSON_LINES");
            assert_eq!(attempts[1].parser, "CSV_TABLE");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn streaming_reader_rejects_foreign_header() {
    match TripCsvReader::new("foo,bar\n1,2\n".as_bytes(), 10) {
        Err(SchemaError::FormatMismatch { parser, .. }) => assert_eq!(parser, "CSV_TABLE"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("foreign header accepted"),
    }
}
