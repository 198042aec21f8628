//! Cinequery - movie question answering
//!
//! Answers movie trivia questions with an LLM, optionally grounded in an
//! indexed movie collection and in live movie facts lookups, behind a
//! semantic answer cache.
//!
//! # Overview
//!
//! A question flows through these stages:
//! - an instruction prefix is chosen for the question type
//! - the semantic cache is consulted and a close enough answer is reused
//! - on a miss, the model answers directly or through one round of tool calls
//! - the new answer is cached and returned with its token usage
//!
//! # Architecture
//!
//! - `question` - Questions, answers and token usage
//! - `config` - Configuration and prompt building
//! - `embedding` - Embedding generation
//! - `vector_store` - Cache and movie index storage
//! - `cache` - Semantic answer cache
//! - `completion` - Chat completion providers
//! - `capabilities` - Movie facts lookups offered to the model
//! - `agent` - Tool dispatch loop
//! - `rag` - Retrieved movie context
//! - `orchestrator` - Request pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use cinequery::config::Settings;
//! use cinequery::orchestrator::Orchestrator;
//! use cinequery::question::{Question, QuestionType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let question = Question::new("Is Titanic a romance?", QuestionType::TrueOrFalse);
//!     let answer = orchestrator.ask(&question).await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cache;
pub mod capabilities;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod question;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CineError, Result};
