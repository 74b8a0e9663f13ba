//! Cache store trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CacheEntry, EntryId, ScopeFilter};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// A candidate returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: CacheEntry,
    /// Distance to the query vector; smaller is closer
    pub distance: f32,
}

impl ScoredEntry {
    pub fn new(entry: CacheEntry, distance: f32) -> Self {
        Self { entry, distance }
    }
}

/// Embedding-keyed store of cache entries
///
/// Implementations must be safe under concurrent calls: inserts never lose
/// each other and readers never observe a partially written entry.
/// Mutations are durable once they return `Ok`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Append an entry. Duplicate content is fine.
    async fn insert(&self, entry: CacheEntry) -> Result<EntryId, DomainError>;

    /// Up to `top_k` entries matching `filter`, closest first.
    ///
    /// Equal distances keep insertion order. No matches is an empty vec.
    async fn query_nearest(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &ScopeFilter,
    ) -> Result<Vec<ScoredEntry>, DomainError>;

    /// Remove matching entries, returning how many were removed
    async fn clear(&self, filter: &ScopeFilter) -> Result<usize, DomainError>;

    async fn count(&self, filter: &ScopeFilter) -> Result<usize, DomainError>;

    /// Remove matching entries created strictly before `cutoff`
    async fn remove_created_before(
        &self,
        cutoff: DateTime<Utc>,
        filter: &ScopeFilter,
    ) -> Result<usize, DomainError>;
}
