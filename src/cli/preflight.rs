//! Pre-flight checks before expensive operations.
//!
//! Validates configuration up front so commands fail before any network
//! call instead of midway through a request.

use crate::config::Settings;
use crate::error::{CineError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the API key.
    Ask,
    /// Indexing embeds movie records, which needs the API key.
    Index,
    /// Cache statistics only read the local store.
    CacheStats,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_api_key()?;
            check_threshold(settings)?;
        }
        Operation::Index => {
            check_api_key()?;
        }
        Operation::CacheStats => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CineError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(CineError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Similarity threshold must be a cosine score.
fn check_threshold(settings: &Settings) -> Result<()> {
    let threshold = settings.cache.similarity_threshold;
    if (-1.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(CineError::Config(format!(
            "cache.similarity_threshold must be between -1.0 and 1.0, got {}",
            threshold
        )))
    }
}
