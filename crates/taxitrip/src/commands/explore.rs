use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use taxitrip_core::exploration::{explore, raw_to_dataframe};
use tracing::info;

#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// Raw trip file (CSV or JSON lines)
    #[arg(short, long)]
    input: PathBuf,
    /// Only profile the first N rows
    #[arg(long, default_value_t = 100_000)]
    sample_size: usize,
    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn handle_explore(args: ExploreArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut records = taxitrip_parser::parse_trip_file(&content)
        .with_context(|| format!("schema error in {}", args.input.display()))?;
    records.truncate(args.sample_size);
    info!(rows = records.len(), "Loaded sample");

    let df = raw_to_dataframe(&records)?;
    let report = explore(&df)?;
    let json = serde_json::to_string_pretty(&report)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Exploration report saved");
        }
        None => println!("{json}"),
    }
    Ok(())
}
