//! Cache command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use crate::orchestrator::open_store;
use anyhow::Result;

/// Run the cache command.
pub async fn run_cache(action: &CacheAction, settings: Settings) -> Result<()> {
    preflight::check(Operation::CacheStats, &settings)?;

    match action {
        CacheAction::Stats => {
            let (cache, movies) = open_store(&settings)?;
            let entries = cache.entry_count().await?;
            let indexed = movies.movie_count().await?;

            Output::header("Cache");
            Output::kv("Store", &settings.vector_store.provider);
            Output::kv("Enabled", &settings.cache.enabled.to_string());
            Output::kv(
                "Similarity threshold",
                &format!("{:.2}", settings.cache.similarity_threshold),
            );
            Output::kv("Cached answers", &entries.to_string());
            Output::kv("Indexed movies", &indexed.to_string());
        }
    }

    Ok(())
}
