//! Questions in, answers out.

use crate::vector_store::CacheEntry;
use serde::{Deserialize, Serialize};

/// Kind of question being asked; selects the instruction prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueOrFalse,
    PopularChoice,
    Estimation,
    /// Any tag outside the known set.
    #[default]
    #[serde(other)]
    Unrecognized,
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true_or_false" => Ok(QuestionType::TrueOrFalse),
            "popular_choice" => Ok(QuestionType::PopularChoice),
            "estimation" => Ok(QuestionType::Estimation),
            _ => Ok(QuestionType::Unrecognized),
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::TrueOrFalse => write!(f, "true_or_false"),
            QuestionType::PopularChoice => write!(f, "popular_choice"),
            QuestionType::Estimation => write!(f, "estimation"),
            QuestionType::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// An inbound question.
#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub kind: QuestionType,
    /// Opaque caller token, echoed back unchanged.
    pub correlation_token: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            text: text.into(),
            kind,
            correlation_token: None,
        }
    }

    pub fn with_correlation_token(mut self, token: Option<String>) -> Self {
        self.correlation_token = token;
        self
    }
}

/// Token counts reported by a single completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage::new(
            self.prompt_tokens + rhs.prompt_tokens,
            self.completion_tokens + rhs.completion_tokens,
        )
    }
}

/// The externally visible answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub correlation_token: Option<String>,
    pub prompt_tokens_used: Option<u32>,
    pub completion_tokens_used: Option<u32>,
}

impl Answer {
    /// Wrap the text and usage of the completion call that produced it.
    pub fn from_completion(
        content: impl Into<String>,
        usage: TokenUsage,
        correlation_token: Option<String>,
    ) -> Self {
        Self {
            answer: content.into(),
            correlation_token,
            prompt_tokens_used: Some(usage.prompt_tokens),
            completion_tokens_used: Some(usage.completion_tokens),
        }
    }

    /// Answer served from the cache; no tokens were spent.
    pub fn from_cache(entry: &CacheEntry, correlation_token: Option<String>) -> Self {
        Self {
            answer: entry.answer.clone(),
            correlation_token,
            prompt_tokens_used: None,
            completion_tokens_used: None,
        }
    }
}
