//! Context building from the movie index.

use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::MovieIndex;
use std::sync::Arc;
use tracing::debug;

/// Builds prompt context from the movies nearest to a question.
pub struct ContextBuilder {
    index: Arc<dyn MovieIndex>,
    embedder: Arc<dyn Embedder>,
    max_movies: usize,
}

impl ContextBuilder {
    pub fn new(index: Arc<dyn MovieIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            max_movies: 5,
        }
    }

    /// Set the maximum number of movies placed in context.
    pub fn with_max_movies(mut self, max_movies: usize) -> Self {
        self.max_movies = max_movies.max(1);
        self
    }

    /// Build context for a question.
    pub async fn build(&self, question: &str) -> Result<Vec<ContextChunk>> {
        let embedding = self.embedder.embed(question).await?;
        self.build_with_embedding(&embedding).await
    }

    /// Build context from an already computed question embedding.
    pub async fn build_with_embedding(&self, embedding: &[f32]) -> Result<Vec<ContextChunk>> {
        let results = self.index.search_movies(embedding, self.max_movies).await?;
        debug!("Retrieved {} movies for context", results.len());
        Ok(results.into_iter().map(ContextChunk::from).collect())
    }
}

/// Format context chunks for a prompt.
///
/// Each movie renders as `Movie Title: .. Release Year: .. Movie Plot: ..`,
/// joined by single spaces. No movies yields an empty string.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let year = chunk
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "Movie Title: {} Release Year: {} Movie Plot: {}",
                chunk.title, year, chunk.plot
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}
