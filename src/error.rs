//! Error types for Cinequery.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Cinequery operations.
#[derive(Error, Debug)]
pub enum CineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool {name}: {reason}")]
    InvalidToolArguments { name: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CineError {
    /// Whether this error means an upstream provider (embedding, search,
    /// completion) could not serve the request.
    pub fn is_provider_unavailable(&self) -> bool {
        matches!(
            self,
            CineError::Embedding(_)
                | CineError::VectorStore(_)
                | CineError::Completion(_)
                | CineError::OpenAI(_)
                | CineError::Timeout { .. }
                | CineError::Http(_)
                | CineError::Database(_)
        )
    }
}

/// Result type alias for Cinequery operations.
pub type Result<T> = std::result::Result<T, CineError>;
