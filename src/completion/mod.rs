//! Completion provider abstraction.
//!
//! The dispatch loop talks to the reasoning model through
//! [`CompletionProvider`] using the provider-neutral transcript types below.

mod openai;

pub use openai::OpenAICompletion;

use crate::capabilities::CapabilitySpec;
use crate::error::Result;
use crate::question::TokenUsage;
use async_trait::async_trait;

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Requester,
    System,
    Assistant,
    ToolResult,
}

/// A capability invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    /// Capability name. Untrusted: checked against the registry before use.
    pub name: String,
    /// Raw JSON arguments, e.g. `{"title": "Inception"}`.
    pub arguments: String,
}

impl std::fmt::Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One turn of the transcript sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Set on tool-result turns: the call this result answers.
    pub tool_call_id: Option<String>,
    /// Set on assistant turns that requested tools.
    pub tool_calls: Vec<ToolCall>,
}

impl Turn {
    pub fn requester(content: impl Into<String>) -> Self {
        Self::plain(Role::Requester, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Assistant turn echoing the model's message, tool calls included.
    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.unwrap_or_default(),
            tool_call_id: None,
            tool_calls,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }
}

/// A provider response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub usage: TokenUsage,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// Final text, empty when the model returned none.
    pub fn text(&self) -> String {
        self.content.clone().unwrap_or_default()
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A reasoning model that completes transcripts.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `transcript`. When `catalogue` is given the model may answer
    /// with tool calls instead of (or alongside) text.
    async fn complete(
        &self,
        transcript: &[Turn],
        catalogue: Option<&[CapabilitySpec]>,
    ) -> Result<Completion>;
}
