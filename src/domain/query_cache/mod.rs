//! Semantic query cache domain models and policies
//!
//! A cached answer is served when a new query lands close enough to a
//! previously answered one in embedding space and the stored answer is
//! still fresh. Everything here is free of I/O except the [`CacheStore`]
//! trait, which infrastructure implements.

mod clock;
mod config;
mod entry;
mod expiry;
mod lookup;
mod repository;
mod scope;
mod similarity;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::QueryCacheConfig;
pub use entry::{CacheEntry, EntryId};
pub use expiry::ExpiryPolicy;
pub use lookup::{
    CacheHit, CacheLookupResult, LookupOutcome, MissReason, SkipReason, WriteOutcome,
};
pub use repository::{CacheStore, ScoredEntry};
pub use scope::{Scope, ScopeFilter, ScopeMode};
pub use similarity::{similarity_from_distance, SimilarityGate, SimilarityMetric};
pub use stats::CacheStats;

#[cfg(test)]
pub use repository::MockCacheStore;
