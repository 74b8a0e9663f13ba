//! Conversation history and answer generation contracts
//!
//! History belongs to the orchestration layer, never to the cache: every
//! turn is recorded exactly once whether it was served from cache or
//! generated fresh.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub response: String,
    /// Whether the answer came from the query cache
    pub from_cache: bool,
}

impl Turn {
    pub fn new(query: impl Into<String>, response: impl Into<String>, from_cache: bool) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            from_cache,
        }
    }
}

/// Produces a fresh answer (the expensive LLM call the cache avoids)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, query: &str, history: &[Turn]) -> Result<String, DomainError>;
}
