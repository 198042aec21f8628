//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{MovieRecord, Orchestrator};
use anyhow::{Context, Result};
use std::path::Path;

/// Read movie records from a JSON array file.
pub fn read_records(path: &Path) -> Result<Vec<MovieRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<MovieRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse movie records in {}", path.display()))?;
    Ok(records)
}

/// Run the index command.
pub async fn run_index(path: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Settings::expand_path(path);
    let records = read_records(&path)?;
    Output::info(&format!("Read {} movie records from {}", records.len(), path.display()));

    let orchestrator = Orchestrator::new(&settings)?;

    let spinner = Output::spinner("Generating embeddings and indexing...");
    let result = orchestrator.index_movies(records).await;
    spinner.finish_and_clear();

    let count = result?;
    Output::success(&format!("Indexed {} movies", count));

    Ok(())
}
