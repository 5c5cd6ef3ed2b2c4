use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use taxitrip_core::outputs::{enriched_to_dataframe, write_dataframe, OutputFormat};
use taxitrip_core::{EnrichedTrip, Pipeline};
use taxitrip_parser::parse_trip_csv;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../taxitrip-parser/tests/data")
        .join(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", path.display(), err))
}

fn enriched_sample() -> Vec<EnrichedTrip> {
    let records = parse_trip_csv(&fixture("trips_sample.csv")).unwrap();
    Pipeline::default().process(records).unwrap().0
}

#[test]
fn format_is_picked_from_the_extension() {
    assert_eq!(
        OutputFormat::from_path(Path::new("out/processed.csv")),
        Some(OutputFormat::Csv)
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("processed.PARQUET")),
        Some(OutputFormat::Parquet)
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("processed.ndjson")),
        Some(OutputFormat::Json)
    );
    assert_eq!(OutputFormat::from_path(Path::new("processed.xlsx")), None);
    assert_eq!(OutputFormat::from_path(Path::new("processed")), None);
}

#[test]
fn frame_holds_input_and_derived_columns() -> PolarsResult<()> {
    let df = enriched_to_dataframe(&enriched_sample())?;

    assert_eq!(df.height(), 7);
    assert_eq!(df.width(), 20);
    assert!(matches!(
        df.column("pickup_datetime")?.dtype(),
        DataType::Datetime(TimeUnit::Microseconds, None)
    ));

    let distance = df.column("trip_distance")?.f64()?;
    assert!((distance.get(0).unwrap() - 0.9311).abs() < 1e-3);

    let category = df.column("time_category")?.str()?;
    assert_eq!(category.get(0), Some("Afternoon"));
    assert_eq!(category.get(1), Some("Night"));

    let weekend = df.column("is_weekend")?.bool()?;
    assert_eq!(weekend.get(4), Some(true));
    Ok(())
}

#[test]
fn empty_input_gives_an_empty_frame() -> PolarsResult<()> {
    let df = enriched_to_dataframe(&[])?;
    assert_eq!(df.height(), 0);
    assert_eq!(df.width(), 20);
    Ok(())
}

#[test]
fn csv_output_has_a_header_and_one_line_per_trip() -> PolarsResult<()> {
    let mut df = enriched_to_dataframe(&enriched_sample())?;
    let mut buffer = Vec::new();
    write_dataframe(&mut df, &mut buffer, OutputFormat::Csv)?;

    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("id,vendor_id,pickup_datetime"));
    assert!(header.ends_with("average_speed,time_category"));
    assert_eq!(lines.count(), 7);
    Ok(())
}

#[test]
fn parquet_output_reads_back() -> PolarsResult<()> {
    let mut df = enriched_to_dataframe(&enriched_sample())?;
    let mut buffer = Vec::new();
    write_dataframe(&mut df, &mut buffer, OutputFormat::Parquet)?;

    let restored = ParquetReader::new(Cursor::new(buffer)).finish()?;
    assert_eq!(restored.shape(), df.shape());
    Ok(())
}

#[test]
fn json_output_is_one_object_per_line() -> PolarsResult<()> {
    let mut df = enriched_to_dataframe(&enriched_sample())?;
    let mut buffer = Vec::new();
    write_dataframe(&mut df, &mut buffer, OutputFormat::Json)?;

    let text = String::from_utf8(buffer).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0]["pickup_day"], "Monday");
    assert_eq!(rows[0]["is_rush_hour"], true);
    Ok(())
}
