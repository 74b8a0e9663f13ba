//! Cache-aware question answering for one conversation

use std::sync::Arc;

use tracing::debug;

use super::QueryCacheService;
use crate::domain::conversation::{ResponseGenerator, Turn};
use crate::domain::query_cache::{CacheLookupResult, Scope};
use crate::domain::DomainError;

/// One conversation backed by the query cache
///
/// Every successful `ask` appends exactly one turn to the history, whether
/// the answer was served from cache or freshly generated.
pub struct ChatSession {
    cache: Arc<QueryCacheService>,
    generator: Arc<dyn ResponseGenerator>,
    scope: Scope,
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn new(
        cache: Arc<QueryCacheService>,
        generator: Arc<dyn ResponseGenerator>,
        session_id: impl Into<String>,
    ) -> Self {
        Self::with_scope(cache, generator, Scope::session(session_id))
    }

    pub fn with_scope(
        cache: Arc<QueryCacheService>,
        generator: Arc<dyn ResponseGenerator>,
        scope: Scope,
    ) -> Self {
        Self {
            cache,
            generator,
            scope,
            history: Vec::new(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Forget the conversation; cached answers stay in the cache
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Answer a query, from cache when possible
    ///
    /// Only generation errors are returned; they leave the history as it was.
    pub async fn ask(&mut self, query: &str) -> Result<Turn, DomainError> {
        let turn = match self.cache.get(query, &self.scope).await {
            CacheLookupResult::Hit(hit) => {
                debug!("Answered from cache ({:.4})", hit.similarity);
                Turn::new(query, hit.response_text, true)
            }
            CacheLookupResult::Miss => {
                let response = self.generator.generate(query, &self.history).await?;
                self.cache.put(query, &response, &self.scope).await;
                Turn::new(query, response, false)
            }
        };

        self.history.push(turn.clone());

        Ok(turn)
    }
}
