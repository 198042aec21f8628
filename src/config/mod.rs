//! Configuration module for Cinequery.
//!
//! Handles loading application settings and building prompts.

mod prompts;
mod settings;

pub use prompts::{PromptBuilder, BREVITY_DIRECTIVE, DISPATCH_DIRECTIVE};
pub use settings::{
    AgentSettings, CacheSettings, CapabilitySettings, CompletionSettings, EmbeddingSettings,
    GeneralSettings, LimitSettings, OpenAISettings, RetrievalSettings, ServerSettings, Settings,
    VectorStoreSettings,
};
