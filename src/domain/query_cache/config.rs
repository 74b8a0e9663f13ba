//! Query cache configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ExpiryPolicy, ScopeMode, SimilarityGate, SimilarityMetric};
use crate::domain::DomainError;

/// Configuration for the semantic query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum similarity (0.0 to 1.0) for a candidate to count as a hit
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum entry age in seconds; 0 disables expiry
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Candidates fetched per lookup, so an expired best match can fall
    /// through to the next one
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub scope_mode: ScopeMode,

    #[serde(default)]
    pub metric: SimilarityMetric,

    /// Directory of the persistent store; in-memory when unset
    #[serde(default)]
    pub persist_directory: Option<PathBuf>,

    /// Embedding model used for query vectors
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Interval of the background expiry sweep; 0 disables it
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_ttl_secs() -> u64 {
    86_400
}

fn default_top_k() -> usize {
    3
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_timeout_ms() -> u64 {
    5_000
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            ttl_secs: default_ttl_secs(),
            top_k: default_top_k(),
            scope_mode: ScopeMode::default(),
            metric: SimilarityMetric::default(),
            persist_directory: None,
            embedding_model: default_embedding_model(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            sweep_interval_secs: 0,
        }
    }
}

impl QueryCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject configurations the cache cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(DomainError::configuration(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.top_k == 0 {
            return Err(DomainError::configuration("top_k must be at least 1"));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(DomainError::configuration("embedding_model must not be empty"));
        }

        if self.embedding_timeout_ms == 0 || self.store_timeout_ms == 0 {
            return Err(DomainError::configuration("timeouts must be greater than zero"));
        }

        Ok(())
    }

    pub fn gate(&self) -> SimilarityGate {
        SimilarityGate::new(self.similarity_threshold, self.metric)
    }

    pub fn expiry(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.ttl_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the similarity threshold (checked by [`Self::validate`], not clamped)
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_scope_mode(mut self, mode: ScopeMode) -> Self {
        self.scope_mode = mode;
        self
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_persist_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_directory = Some(dir.into());
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_embedding_timeout(mut self, timeout: Duration) -> Self {
        self.embedding_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }
}
