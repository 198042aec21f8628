//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Cache ids come from `AUTOINCREMENT`, so allocation and insert are one
//! statement and ids are never reused, even after deletes.

use super::{
    check_dimensions, cosine_similarity, rank, CacheEntry, CacheStore, Movie, MovieIndex, ScoredEntry,
    ScoredMovie,
};
use crate::error::{CineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS movies (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    year INTEGER,
    genre TEXT,
    plot TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_movies_title ON movies(title);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CineError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
        let id: i64 = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(3)?;
        let created_at: String = row.get(4)?;

        Ok(CacheEntry {
            id: id as u64,
            question: row.get(1)?,
            answer: row.get(2)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_movie(row: &Row<'_>) -> rusqlite::Result<Movie> {
        let id: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at: String = row.get(6)?;

        Ok(Movie {
            id: uuid::Uuid::parse_str(&id).unwrap_or_default(),
            title: row.get(1)?,
            year: row.get(2)?,
            genre: row.get(3)?,
            plot: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_timestamp(&indexed_at),
        })
    }

    fn write_movie(conn: &Connection, movie: &Movie) -> Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO movies (id, title, year, genre, plot, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                movie.id.to_string(),
                movie.title,
                movie.year,
                movie.genre,
                movie.plot,
                Self::embedding_to_bytes(&movie.embedding),
                movie.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for SqliteVectorStore {
    #[instrument(skip(self, query_embedding))]
    async fn search_entries(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEntry>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, question, answer, embedding, created_at FROM cache_entries")?;

        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for entry in &entries {
            check_dimensions(query_embedding, entry)?;
        }

        let scored = entries.into_iter().map(|e| {
            let score = cosine_similarity(query_embedding, &e.embedding);
            (e, score)
        });

        Ok(rank(scored, top_k, min_score)
            .into_iter()
            .map(|(entry, score)| ScoredEntry { entry, score })
            .collect())
    }

    #[instrument(skip(self, question, answer, embedding))]
    async fn insert_entry(&self, question: &str, answer: &str, embedding: &[f32]) -> Result<u64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO cache_entries (question, answer, embedding, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                question,
                answer,
                Self::embedding_to_bytes(embedding),
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid() as u64;
        debug!("Inserted cache entry {}", id);
        Ok(id)
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl MovieIndex for SqliteVectorStore {
    #[instrument(skip(self, movie))]
    async fn upsert_movie(&self, movie: &Movie) -> Result<()> {
        let conn = self.lock()?;
        Self::write_movie(&conn, movie)?;
        debug!("Upserted movie {}", movie.title);
        Ok(())
    }

    #[instrument(skip(self, movies))]
    async fn upsert_movies(&self, movies: &[Movie]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for movie in movies {
            Self::write_movie(&tx, movie)?;
        }

        tx.commit()?;
        info!("Batch upserted {} movies", movies.len());
        Ok(movies.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_movies(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredMovie>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, year, genre, plot, embedding, indexed_at FROM movies",
        )?;

        let movies = stmt
            .query_map([], Self::row_to_movie)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let scored = movies.into_iter().map(|m| {
            let score = cosine_similarity(query_embedding, &m.embedding);
            (m, score)
        });

        Ok(rank(scored, top_k, f32::MIN)
            .into_iter()
            .map(|(movie, score)| ScoredMovie { movie, score })
            .collect())
    }

    async fn movie_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.25_f32, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }

    #[tokio::test]
    async fn test_cache_ids_are_sequential() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let a = store.insert_entry("q1", "a1", &[1.0, 0.0]).await.unwrap();
        let b = store.insert_entry("q2", "a2", &[0.0, 1.0]).await.unwrap();

        assert_eq!((a, b), (1, 2));
        assert_eq!(store.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cache_search_rejects_dimension_mismatch() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.insert_entry("q1", "a1", &[1.0, 0.0, 0.0]).await.unwrap();

        let err = store.search_entries(&[1.0, 0.0], 5, 0.9).await.unwrap_err();
        assert!(matches!(err, CineError::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_cache_search_threshold() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .insert_entry("Who directed Inception?", "Christopher Nolan", &[1.0, 0.0])
            .await
            .unwrap();

        let hits = store.search_entries(&[1.0, 0.0], 5, 0.9).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, 1);
        assert_eq!(hits[0].entry.question, "Who directed Inception?");

        let misses = store.search_entries(&[0.0, 1.0], 5, 0.9).await.unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("vectors.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store.insert_entry("q1", "a1", &[1.0]).await.unwrap();
            store
                .upsert_movie(&Movie::new(
                    "Inception".to_string(),
                    Some(2010),
                    None,
                    "Dreams within dreams.".to_string(),
                    vec![1.0, 0.0],
                ))
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(store.entry_count().await.unwrap(), 1);
        assert_eq!(store.insert_entry("q2", "a2", &[1.0]).await.unwrap(), 2);

        let movies = store.search_movies(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].movie.title, "Inception");
        assert_eq!(movies[0].movie.year, Some(2010));
        assert_eq!(movies[0].movie.genre, None);
    }
}
