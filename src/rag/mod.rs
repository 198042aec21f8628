//! Retrieved movie context for answering questions.
//!
//! Looks up the movies closest to a question in the movie index and renders
//! them as prompt context.

pub mod context;

pub use context::{format_context_for_prompt, ContextBuilder};

use crate::vector_store::ScoredMovie;

/// A retrieved movie ready to be placed in a prompt.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub plot: String,
    /// Similarity score.
    pub score: f32,
}

impl From<ScoredMovie> for ContextChunk {
    fn from(result: ScoredMovie) -> Self {
        Self {
            title: result.movie.title,
            year: result.movie.year,
            genre: result.movie.genre,
            plot: result.movie.plot,
            score: result.score,
        }
    }
}
