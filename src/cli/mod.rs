//! CLI module for Cinequery.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::question::QuestionType;
use clap::{Parser, Subcommand};

/// Cinequery - movie question answering
///
/// Answers movie questions with an LLM, grounded in an indexed movie
/// collection, live movie facts lookups and a semantic answer cache.
#[derive(Parser, Debug)]
#[command(name = "cinequery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CINEQUERY_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a movie question
    Ask {
        /// The question to ask
        question: String,

        /// Question type (multiple_choice, true_or_false, popular_choice, estimation)
        #[arg(short = 't', long = "type", default_value = "unrecognized")]
        kind: QuestionType,

        /// Opaque token echoed back with the answer
        #[arg(long)]
        correlation_token: Option<String>,
    },

    /// Index movie records from a JSON file for retrieved context
    Index {
        /// JSON array of {title, year, genre, plot} records
        path: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect the semantic answer cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the number of cached answers
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
