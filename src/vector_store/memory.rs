//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    check_dimensions, cosine_similarity, rank, CacheEntry, CacheStore, Movie, MovieIndex, ScoredEntry,
    ScoredMovie,
};
use crate::error::{CineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct CacheTable {
    entries: Vec<CacheEntry>,
    last_id: u64,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    cache: RwLock<CacheTable>,
    movies: RwLock<HashMap<Uuid, Movie>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(CacheTable::default()),
            movies: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> CineError {
    CineError::VectorStore(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl CacheStore for MemoryVectorStore {
    async fn search_entries(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>> {
        let table = self.cache.read().map_err(poisoned)?;
        for entry in &table.entries {
            check_dimensions(query_embedding, entry)?;
        }

        let scored = table
            .entries
            .iter()
            .map(|e| (e, cosine_similarity(query_embedding, &e.embedding)));

        Ok(rank(scored, top_k, min_score)
            .into_iter()
            .map(|(entry, score)| ScoredEntry {
                entry: entry.clone(),
                score,
            })
            .collect())
    }

    async fn insert_entry(&self, question: &str, answer: &str, embedding: &[f32]) -> Result<u64> {
        // Allocate and write under one lock.
        let mut table = self.cache.write().map_err(poisoned)?;
        table.last_id += 1;
        let id = table.last_id;
        table.entries.push(CacheEntry {
            id,
            question: question.to_string(),
            answer: answer.to_string(),
            embedding: embedding.to_vec(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn entry_count(&self) -> Result<usize> {
        Ok(self.cache.read().map_err(poisoned)?.entries.len())
    }
}

#[async_trait]
impl MovieIndex for MemoryVectorStore {
    async fn upsert_movie(&self, movie: &Movie) -> Result<()> {
        let mut movies = self.movies.write().map_err(poisoned)?;
        movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn upsert_movies(&self, movies: &[Movie]) -> Result<usize> {
        let mut store = self.movies.write().map_err(poisoned)?;
        for movie in movies {
            store.insert(movie.id, movie.clone());
        }
        Ok(movies.len())
    }

    async fn search_movies(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredMovie>> {
        let movies = self.movies.read().map_err(poisoned)?;

        let scored = movies
            .values()
            .map(|m| (m, cosine_similarity(query_embedding, &m.embedding)));

        Ok(rank(scored, top_k, f32::MIN)
            .into_iter()
            .map(|(movie, score)| ScoredMovie {
                movie: movie.clone(),
                score,
            })
            .collect())
    }

    async fn movie_count(&self) -> Result<usize> {
        Ok(self.movies.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cache_insert_and_search() {
        let store = MemoryVectorStore::new();

        let first = store
            .insert_entry("Who directed Inception?", "Christopher Nolan", &[1.0, 0.0, 0.0])
            .await
            .unwrap();
        let second = store
            .insert_entry("What year is Titanic from?", "1997", &[0.0, 1.0, 0.0])
            .await
            .unwrap();

        assert_eq!((first, second), (1, 2));
        assert_eq!(store.entry_count().await.unwrap(), 2);

        let hits = store.search_entries(&[1.0, 0.05, 0.0], 5, 0.9).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.answer, "Christopher Nolan");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_unique_ids() {
        let store = Arc::new(MemoryVectorStore::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_entry(&format!("q{}", i), "a", &[1.0, i as f32])
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_movie_search_ranks_by_similarity() {
        let store = MemoryVectorStore::new();

        let inception = Movie::new(
            "Inception".to_string(),
            Some(2010),
            Some("Sci-Fi".to_string()),
            "A thief enters dreams.".to_string(),
            vec![1.0, 0.0],
        );
        let titanic = Movie::new(
            "Titanic".to_string(),
            Some(1997),
            Some("Romance".to_string()),
            "A ship sinks.".to_string(),
            vec![0.0, 1.0],
        );

        store.upsert_movies(&[inception, titanic]).await.unwrap();
        assert_eq!(store.movie_count().await.unwrap(), 2);

        let results = store.search_movies(&[0.1, 1.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].movie.title, "Titanic");
        assert!(results[0].score > results[1].score);
    }
}
