//! Named lookups the model can ask for during a dispatch run.
//!
//! Every capability takes a movie title and returns displayable text. A
//! failing lookup yields [`CapabilityOutcome::SoftFailure`] with a
//! placeholder message; it never surfaces as an error.

mod movie_facts;

pub use movie_facts::{MovieAttribute, MovieAttributeCapability, MovieFactsClient};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// How a capability is advertised to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Result of a capability lookup. Both arms render as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityOutcome {
    Found(String),
    SoftFailure(String),
}

impl CapabilityOutcome {
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, CapabilityOutcome::SoftFailure(_))
    }

    pub fn as_text(&self) -> &str {
        match self {
            CapabilityOutcome::Found(text) | CapabilityOutcome::SoftFailure(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            CapabilityOutcome::Found(text) | CapabilityOutcome::SoftFailure(text) => text,
        }
    }
}

/// A single-argument (movie title) lookup.
#[async_trait]
pub trait Capability: Send + Sync {
    fn spec(&self) -> CapabilitySpec;

    /// Look up `title`. Must not fail; failures become a soft-failure text.
    async fn lookup(&self, title: &str) -> CapabilityOutcome;
}

/// Registered capabilities by name, in registration order.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    by_name: HashMap<String, Arc<dyn Capability>>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five movie-attribute capabilities.
    pub fn movie_facts(client: Arc<MovieFactsClient>) -> Self {
        MovieAttribute::ALL
            .iter()
            .fold(Self::new(), |registry, attribute| {
                registry.with(Arc::new(MovieAttributeCapability::new(*attribute, client.clone())))
            })
    }

    /// Add a capability, replacing any existing one with the same name.
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.spec().name;
        if self.by_name.insert(name.clone(), capability).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Specs for every registered capability, in registration order.
    pub fn catalogue(&self) -> Vec<CapabilitySpec> {
        self.order
            .iter()
            .filter_map(|name| self.by_name.get(name))
            .map(|c| c.spec())
            .collect()
    }
}
