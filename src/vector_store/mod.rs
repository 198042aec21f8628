//! Vector store abstraction for Cinequery.
//!
//! Two collections live behind these traits: the semantic answer cache and
//! the movie index used for retrieved context. Both backends (memory and
//! SQLite) implement both traits.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{CineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A previously answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Sequence id allocated by the store. Never reused.
    pub id: u64,
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A cache entry with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: CacheEntry,
    pub score: f32,
}

/// Store of cached question/answer pairs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Entries scoring at least `min_score`, best first, at most `top_k`.
    ///
    /// Fails if any stored embedding differs in length from the query.
    async fn search_entries(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>>;

    /// Insert a new entry and return the id the store allocated for it.
    ///
    /// Id allocation is atomic with the write: concurrent inserts never
    /// observe the same id.
    async fn insert_entry(&self, question: &str, answer: &str, embedding: &[f32]) -> Result<u64>;

    /// Number of stored entries.
    async fn entry_count(&self) -> Result<usize>;
}

/// A movie record used as retrieval context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub plot: String,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl Movie {
    pub fn new(
        title: String,
        year: Option<i32>,
        genre: Option<String>,
        plot: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            year,
            genre,
            plot,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A movie with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredMovie {
    pub movie: Movie,
    pub score: f32,
}

/// Index of movie records searchable by embedding.
#[async_trait]
pub trait MovieIndex: Send + Sync {
    /// Store a movie, replacing any record with the same id.
    async fn upsert_movie(&self, movie: &Movie) -> Result<()>;

    /// Bulk upsert movies.
    async fn upsert_movies(&self, movies: &[Movie]) -> Result<usize>;

    /// Nearest movies, best first.
    async fn search_movies(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredMovie>>;

    /// Number of indexed movies.
    async fn movie_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
///
/// Mismatched or empty vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Fail when a stored cache embedding cannot be compared with the query.
pub(crate) fn check_dimensions(query: &[f32], entry: &CacheEntry) -> Result<()> {
    if query.len() == entry.embedding.len() {
        Ok(())
    } else {
        Err(CineError::VectorStore(format!(
            "Embedding dimension mismatch: query has {}, cache entry {} has {}",
            query.len(),
            entry.id,
            entry.embedding.len()
        )))
    }
}

/// Keep the best `limit` results at or above `min_score`, best first.
pub(crate) fn rank<T>(
    candidates: impl Iterator<Item = (T, f32)>,
    limit: usize,
    min_score: f32,
) -> Vec<(T, f32)> {
    let mut ranked: Vec<(T, f32)> = candidates.filter(|(_, score)| *score >= min_score).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}
