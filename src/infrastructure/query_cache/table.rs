//! Insertion-ordered entry table shared by the store implementations

use chrono::{DateTime, Utc};

use crate::domain::query_cache::{
    CacheEntry, ScopeFilter, ScoredEntry, SimilarityMetric,
};
use crate::domain::DomainError;

/// Entries in insertion order plus exact nearest-neighbour search
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    entries: Vec<CacheEntry>,
    metric: SimilarityMetric,
}

impl EntryTable {
    pub(crate) fn new(metric: SimilarityMetric) -> Self {
        Self {
            entries: Vec::new(),
            metric,
        }
    }

    pub(crate) fn from_entries(entries: Vec<CacheEntry>, metric: SimilarityMetric) -> Self {
        Self { entries, metric }
    }

    pub(crate) fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Vector dimension shared by all entries, if any exist
    pub(crate) fn dimensions(&self) -> Option<usize> {
        self.entries.first().map(CacheEntry::dimensions)
    }

    pub(crate) fn check_dimensions(&self, dimensions: usize) -> Result<(), DomainError> {
        if dimensions == 0 {
            return Err(DomainError::validation("vector must not be empty"));
        }

        match self.dimensions() {
            Some(expected) if expected != dimensions => Err(DomainError::validation(format!(
                "vector dimension mismatch: store holds {}, got {}",
                expected, dimensions
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn push(&mut self, entry: CacheEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn nearest(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &ScopeFilter,
    ) -> Result<Vec<ScoredEntry>, DomainError> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        self.check_dimensions(vector.len())?;

        let mut results: Vec<ScoredEntry> = self
            .entries
            .iter()
            .filter(|entry| filter.matches(entry.scope()))
            .map(|entry| {
                let distance = self.metric.distance(vector, entry.query_vector());
                ScoredEntry::new(entry.clone(), distance)
            })
            .collect();

        // stable sort: equal distances keep insertion order
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(top_k);

        Ok(results)
    }

    pub(crate) fn count(&self, filter: &ScopeFilter) -> usize {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry.scope()))
            .count()
    }

    /// Remove entries matching the predicate, returning how many went
    pub(crate) fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entry| !predicate(entry));
        before - self.entries.len()
    }

    /// Copy of the table without the entries matching the predicate, plus how many were left out
    pub(crate) fn without<F>(&self, predicate: F) -> (EntryTable, usize)
    where
        F: Fn(&CacheEntry) -> bool,
    {
        let kept: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|entry| !predicate(entry))
            .cloned()
            .collect();
        let removed = self.entries.len() - kept.len();

        (Self::from_entries(kept, self.metric), removed)
    }

    pub(crate) fn remove_matching(&mut self, filter: &ScopeFilter) -> usize {
        self.remove_where(|entry| filter.matches(entry.scope()))
    }

    pub(crate) fn remove_created_before(
        &mut self,
        cutoff: DateTime<Utc>,
        filter: &ScopeFilter,
    ) -> usize {
        self.remove_where(|entry| entry.created_at() < cutoff && filter.matches(entry.scope()))
    }
}
