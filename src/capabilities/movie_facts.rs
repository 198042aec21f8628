//! Movie attribute lookups against the movie facts HTTP API.
//!
//! Each attribute lives at `<base_url><attribute>` and takes the movie title
//! in a `title` request header. The response body is the answer text.

use super::{Capability, CapabilityOutcome, CapabilitySpec};
use crate::error::{CineError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// A movie attribute the facts API can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieAttribute {
    Rating,
    Year,
    Actor,
    Location,
    Genre,
}

impl MovieAttribute {
    pub const ALL: [MovieAttribute; 5] = [
        MovieAttribute::Rating,
        MovieAttribute::Year,
        MovieAttribute::Actor,
        MovieAttribute::Location,
        MovieAttribute::Genre,
    ];

    /// Path segment on the facts API.
    pub fn path(&self) -> &'static str {
        match self {
            MovieAttribute::Rating => "rating",
            MovieAttribute::Year => "year",
            MovieAttribute::Actor => "actor",
            MovieAttribute::Location => "location",
            MovieAttribute::Genre => "genre",
        }
    }

    /// Capability name offered to the model.
    pub fn tool_name(&self) -> String {
        format!("get_movie_{}", self.path())
    }

    pub fn description(&self) -> String {
        format!("Gets the {} of a movie", self.path())
    }

    /// Text returned when the lookup fails.
    pub fn placeholder(&self) -> String {
        let article = match self {
            MovieAttribute::Actor => "an",
            _ => "a",
        };
        format!("Sorry, I couldn't find {} {} for that movie.", article, self.path())
    }
}

/// HTTP client for the movie facts API.
pub struct MovieFactsClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl MovieFactsClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| CineError::Config(format!("Invalid capabilities base_url {}: {}", base_url, e)))?;

        // Url::join drops the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = Duration::from_secs(timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Fetch an attribute for a title.
    #[instrument(skip(self))]
    pub async fn fetch(&self, attribute: MovieAttribute, title: &str) -> Result<String> {
        let url = self
            .base_url
            .join(attribute.path())
            .map_err(|e| CineError::Config(e.to_string()))?;

        let body = self
            .http
            .get(url)
            .header("title", title)
            .send()
            .await
            .map_err(|e| self.classify(attribute, e))?
            .error_for_status()?
            .text()
            .await
            .map_err(|e| self.classify(attribute, e))?;

        debug!("Movie facts API returned {} for {}: {}", attribute.path(), title, body);
        Ok(body)
    }

    fn classify(&self, attribute: MovieAttribute, e: reqwest::Error) -> CineError {
        if e.is_timeout() {
            CineError::Timeout {
                operation: format!("{} lookup", attribute.path()),
                after: self.timeout,
            }
        } else {
            CineError::Http(e)
        }
    }
}

/// Capability returning one movie attribute.
pub struct MovieAttributeCapability {
    attribute: MovieAttribute,
    client: Arc<MovieFactsClient>,
}

impl MovieAttributeCapability {
    pub fn new(attribute: MovieAttribute, client: Arc<MovieFactsClient>) -> Self {
        Self { attribute, client }
    }
}

#[async_trait]
impl Capability for MovieAttributeCapability {
    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec::new(self.attribute.tool_name(), self.attribute.description())
    }

    async fn lookup(&self, title: &str) -> CapabilityOutcome {
        match self.client.fetch(self.attribute, title).await {
            Ok(text) => CapabilityOutcome::Found(text),
            Err(e) => {
                warn!("Lookup of {} for {:?} failed: {}", self.attribute.path(), title, e);
                CapabilityOutcome::SoftFailure(self.attribute.placeholder())
            }
        }
    }
}
