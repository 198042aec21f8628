//! Tool dispatch for movie questions.
//!
//! Lets the model request movie lookups, feeds their results back, and takes
//! exactly one follow-up answer.

mod runner;

pub use runner::{DispatchOutcome, ToolCallRecord, ToolDispatchLoop};
