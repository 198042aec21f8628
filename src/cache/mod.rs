//! Semantic answer cache.
//!
//! Questions are matched by embedding similarity rather than exact text, so
//! differently phrased questions about the same fact can share an answer.
//! Embedding and store failures are returned to the caller as-is; a broken
//! cache is never reported as a miss.

use crate::config::CacheSettings;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{CacheEntry, CacheStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Best-ranked entry at or above the similarity threshold.
    Hit { entry: CacheEntry, score: f32 },
    /// Nothing close enough. Carries the query embedding so a later
    /// [`CacheGate::store_embedded`] does not embed the question twice.
    Miss { embedding: Vec<f32> },
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }
}

/// Decides whether a previously computed answer may be reused.
pub struct CacheGate {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CacheStore>,
    similarity_threshold: f32,
    top_k: usize,
}

impl CacheGate {
    /// Create a gate with the reference threshold (0.9) and top-5 search.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_settings(embedder, store, &CacheSettings::default())
    }

    pub fn with_settings(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CacheStore>,
        settings: &CacheSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            similarity_threshold: settings.similarity_threshold,
            top_k: settings.top_k.max(1),
        }
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Embed the question and look for a sufficiently similar cached entry.
    #[instrument(skip(self, question))]
    pub async fn lookup(&self, question: &str) -> Result<CacheLookup> {
        let embedding = self.embedder.embed(question).await?;

        let mut candidates = self
            .store
            .search_entries(&embedding, self.top_k, self.similarity_threshold)
            .await?;

        // Stores filter on the threshold already; re-check so a lenient
        // backend cannot produce a hit below it.
        candidates.retain(|c| c.score >= self.similarity_threshold);

        match candidates.into_iter().next() {
            Some(best) => {
                info!(
                    "Cache hit: entry {} (similarity {:.4})",
                    best.entry.id, best.score
                );
                Ok(CacheLookup::Hit {
                    entry: best.entry,
                    score: best.score,
                })
            }
            None => {
                debug!("Cache miss");
                Ok(CacheLookup::Miss { embedding })
            }
        }
    }

    /// Embed the question and store a new entry. Returns the allocated id.
    #[instrument(skip(self, question, answer))]
    pub async fn store(&self, question: &str, answer: &str) -> Result<u64> {
        let embedding = self.embedder.embed(question).await?;
        self.store_embedded(question, answer, &embedding).await
    }

    /// Store a new entry using an embedding computed by [`CacheGate::lookup`].
    pub async fn store_embedded(&self, question: &str, answer: &str, embedding: &[f32]) -> Result<u64> {
        let id = self.store.insert_entry(question, answer, embedding).await?;
        info!("Cached answer for question as entry {}", id);
        Ok(id)
    }

    /// Number of cached entries.
    pub async fn len(&self) -> Result<usize> {
        self.store.entry_count().await
    }
}
