//! CLI command implementations.

mod ask;
mod cache;
mod config;
mod index;
mod serve;

pub use ask::run_ask;
pub use cache::run_cache;
pub use config::run_config;
pub use index::{read_records, run_index};
pub use serve::{router, run_serve, AppState};
