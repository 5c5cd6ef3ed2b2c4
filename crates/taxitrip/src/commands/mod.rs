pub mod db;
pub mod explore;
pub mod process;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use taxitrip_core::PipelineConfig;
use tracing::warn;

/// Expands a glob pattern into the files it names, in sorted order.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("invalid input pattern '{pattern}'"))? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "could not read path from input pattern"),
        }
    }
    if paths.is_empty() {
        bail!("no input files match '{pattern}'");
    }
    paths.sort();
    Ok(paths)
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}
