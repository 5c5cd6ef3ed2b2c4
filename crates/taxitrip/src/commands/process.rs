use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use comfy_table::Table;
use taxitrip_core::db;
use taxitrip_core::outputs::{enriched_to_dataframe, write_dataframe, OutputFormat};
use taxitrip_core::repository::{PostgresTripRepository, TripRepository};
use taxitrip_core::{
    DatabaseSettings, EnrichedTrip, Pipeline, ProcessingStats, SingleTripOutcome, TripRecord,
    Validator,
};
use taxitrip_parser::{parse_trip_json_lines, TripCsvReader};
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_config, resolve_inputs};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input file or glob pattern (CSV or JSON lines)
    #[arg(short, long)]
    input: String,
    /// Output file; the extension picks CSV, Parquet or JSON lines
    #[arg(short, long)]
    output: PathBuf,
    /// TOML file overriding the default thresholds
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    #[arg(short, long)]
    input: String,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip running migrations before loading
    #[arg(long)]
    skip_migrations: bool,
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// A single trip as a JSON object
    #[arg(long)]
    json: String,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn is_json_lines(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jsonl" | "ndjson" | "json")
    )
}

/// Runs every input through the pipeline chunk by chunk. The first schema
/// error aborts the whole run.
fn process_inputs(
    pattern: &str,
    pipeline: &Pipeline,
    chunk_size: usize,
) -> Result<(Vec<EnrichedTrip>, ProcessingStats)> {
    let mut enriched = Vec::new();
    let mut stats = ProcessingStats::default();

    for path in resolve_inputs(pattern)? {
        info!(path = %path.display(), "Processing file");
        let mut run_chunk = |records: Vec<TripRecord>| -> Result<()> {
            let (trips, chunk_stats) = pipeline
                .process(records)
                .with_context(|| format!("failed to process {}", path.display()))?;
            enriched.extend(trips);
            stats.merge(&chunk_stats);
            Ok(())
        };

        if is_json_lines(&path) {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let records = parse_trip_json_lines(&content)
                .with_context(|| format!("schema error in {}", path.display()))?;
            run_chunk(records)?;
        } else {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let reader = TripCsvReader::new(BufReader::new(file), chunk_size)
                .with_context(|| format!("schema error in {}", path.display()))?;
            for chunk in reader {
                let records = chunk.with_context(|| format!("schema error in {}", path.display()))?;
                run_chunk(records)?;
            }
        }
    }

    Ok((enriched, stats))
}

fn print_summary(stats: &ProcessingStats) {
    let v = &stats.validation;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    for (name, value) in [
        ("original_count", v.original_count),
        ("invalid_passengers", v.invalid_passengers),
        ("invalid_duration", v.invalid_duration),
        ("invalid_coordinates", v.invalid_coordinates),
        ("total_removed", v.total_removed),
        ("final_count", v.final_count),
    ] {
        table.add_row(vec![name.to_string(), value.to_string()]);
    }
    table.add_row(vec![
        "features_added".to_string(),
        stats.features_added.join(", "),
    ]);
    println!("{table}");
}

pub fn handle_process(args: ProcessArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let format = OutputFormat::from_path(&args.output).ok_or_else(|| {
        anyhow!(
            "cannot infer output format from {}; use .csv, .parquet or .json",
            args.output.display()
        )
    })?;
    let chunk_size = config.chunk_size;
    let pipeline = Pipeline::new(config);

    let (enriched, stats) = process_inputs(&args.input, &pipeline, chunk_size)?;

    let mut df = enriched_to_dataframe(&enriched)?;
    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    write_dataframe(&mut df, &mut writer, format)?;
    writer.flush()?;
    info!(
        path = %args.output.display(),
        rows = enriched.len(),
        "Processed data saved"
    );

    print_summary(&stats);
    Ok(())
}

pub async fn handle_load(args: LoadArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let chunk_size = config.chunk_size;
    let pipeline = Pipeline::new(config);
    let (enriched, stats) = process_inputs(&args.input, &pipeline, chunk_size)?;

    let pool = db::connect(&DatabaseSettings::from_env()?).await?;
    if args.skip_migrations {
        warn!("Skipping migrations before loading");
    } else {
        db::run_migrations(&pool).await?;
    }
    let repo = PostgresTripRepository::new(pool);

    let batch_id = Uuid::new_v4();
    let inserted = repo.insert_trips(batch_id, &enriched).await?;

    let dates: BTreeSet<_> = enriched
        .iter()
        .map(|trip| trip.record.pickup_datetime.date())
        .collect();
    for date in &dates {
        repo.refresh_daily_aggregate(*date).await?;
    }
    info!(%batch_id, inserted, days = dates.len(), "Load completed");

    print_summary(&stats);
    println!("load batch {batch_id}: {inserted} trips stored");
    Ok(())
}

pub fn handle_enrich(args: EnrichArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let value: serde_json::Value =
        serde_json::from_str(&args.json).context("--json is not valid JSON")?;
    let record = TripRecord::from_json(&value, 1)?;

    match Pipeline::new(config).process_single(record)? {
        SingleTripOutcome::Enriched(trip) => {
            println!("{}", serde_json::to_string_pretty(&trip)?);
        }
        SingleTripOutcome::Rejected(reasons) => {
            let reasons: Vec<_> = reasons.iter().map(|r| r.as_str()).collect();
            println!("{}", serde_json::json!({ "rejected": reasons }));
        }
    }
    Ok(())
}

pub fn handle_rules(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let report = Validator::new(config.validation).rules_report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
