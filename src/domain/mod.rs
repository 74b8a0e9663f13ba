//! Domain layer - Core types, policies and traits

pub mod conversation;
pub mod embedding;
pub mod error;
pub mod query_cache;

pub use conversation::{ResponseGenerator, Turn};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use query_cache::{
    CacheEntry, CacheHit, CacheLookupResult, CacheStats, CacheStore, EntryId, LookupOutcome,
    MissReason, QueryCacheConfig, Scope, ScopeFilter, ScopeMode, WriteOutcome,
};
