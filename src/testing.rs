//! Test doubles shared by the unit tests.

use crate::capabilities::{Capability, CapabilityOutcome, CapabilitySpec};
use crate::completion::{Completion, CompletionProvider, ToolCall, Turn};
use crate::embedding::Embedder;
use crate::error::{CineError, Result};
use crate::question::TokenUsage;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embedder returning fixed vectors per text, or a default vector.
pub struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            default: vec![0.5, 0.5],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.default.len()
    }
}

/// Embedder whose provider is down.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(CineError::Embedding("embedding provider unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(CineError::Embedding("embedding provider unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// What a [`ScriptedCompletion`] was asked.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub transcript: Vec<Turn>,
    /// Capability names offered, `None` when no catalogue was passed.
    pub catalogue: Option<Vec<String>>,
}

/// Completion provider replaying queued responses in order.
///
/// Fails with a completion error once the queue is empty.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Completion>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(content: &str, usage: TokenUsage) -> Completion {
        Completion {
            content: Some(content.to_string()),
            usage,
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolCall>, usage: TokenUsage) -> Completion {
        Completion {
            content: None,
            usage,
            tool_calls,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(
        &self,
        transcript: &[Turn],
        catalogue: Option<&[CapabilitySpec]>,
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(RecordedCall {
            transcript: transcript.to_vec(),
            catalogue: catalogue.map(|c| c.iter().map(|s| s.name.clone()).collect()),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CineError::Completion("no scripted response left".to_string()))
    }
}

/// Tool call asking for `name` with `{"title": title}`.
pub fn tool_call(id: &str, name: &str, title: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::json!({ "title": title }).to_string(),
    }
}

/// Capability returning a fixed outcome and recording the titles asked.
pub struct RecordingCapability {
    name: String,
    outcome: CapabilityOutcome,
    titles: Mutex<Vec<String>>,
}

impl RecordingCapability {
    pub fn found(name: &str, text: &str) -> Self {
        Self::with_outcome(name, CapabilityOutcome::Found(text.to_string()))
    }

    pub fn soft_failure(name: &str, text: &str) -> Self {
        Self::with_outcome(name, CapabilityOutcome::SoftFailure(text.to_string()))
    }

    fn with_outcome(name: &str, outcome: CapabilityOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            titles: Mutex::new(Vec::new()),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(self.name.clone(), format!("Test capability {}", self.name))
    }

    async fn lookup(&self, title: &str) -> CapabilityOutcome {
        self.titles.lock().unwrap().push(title.to_string());
        self.outcome.clone()
    }
}
