//! In-memory cache store

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::table::EntryTable;
use crate::domain::query_cache::{
    CacheEntry, CacheStore, EntryId, ScopeFilter, ScoredEntry, SimilarityMetric,
};
use crate::domain::DomainError;

/// In-memory cache store using exact linear search
///
/// Suitable for tests and single-process deployments that do not need
/// the cache to survive a restart. Use [`super::FileCacheStore`] otherwise.
#[derive(Debug)]
pub struct InMemoryCacheStore {
    table: RwLock<EntryTable>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::with_metric(SimilarityMetric::default())
    }

    pub fn with_metric(metric: SimilarityMetric) -> Self {
        Self {
            table: RwLock::new(EntryTable::new(metric)),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(e: impl std::fmt::Display) -> DomainError {
    DomainError::storage(format!("Cache store lock poisoned: {}", e))
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn insert(&self, entry: CacheEntry) -> Result<EntryId, DomainError> {
        let mut table = self.table.write().map_err(poisoned)?;

        table.check_dimensions(entry.dimensions())?;

        let id = entry.id().clone();
        table.push(entry);

        Ok(id)
    }

    async fn query_nearest(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &ScopeFilter,
    ) -> Result<Vec<ScoredEntry>, DomainError> {
        let table = self.table.read().map_err(poisoned)?;

        table.nearest(vector, top_k, filter)
    }

    async fn clear(&self, filter: &ScopeFilter) -> Result<usize, DomainError> {
        let mut table = self.table.write().map_err(poisoned)?;

        Ok(table.remove_matching(filter))
    }

    async fn count(&self, filter: &ScopeFilter) -> Result<usize, DomainError> {
        let table = self.table.read().map_err(poisoned)?;

        Ok(table.count(filter))
    }

    async fn remove_created_before(
        &self,
        cutoff: DateTime<Utc>,
        filter: &ScopeFilter,
    ) -> Result<usize, DomainError> {
        let mut table = self.table.write().map_err(poisoned)?;

        Ok(table.remove_created_before(cutoff, filter))
    }
}
