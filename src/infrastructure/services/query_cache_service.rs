//! Semantic query cache service
//!
//! Coordinates the embedding provider, the cache store and the similarity
//! and expiry policies. Lookups run EMBED -> QUERY_NEAREST -> GATE ->
//! EXPIRY; any provider or storage failure along the way degrades to a
//! miss (or a skipped write) and is only visible through logs, metrics and
//! the detailed [`LookupOutcome`] / [`WriteOutcome`] values.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest};
use crate::domain::query_cache::{
    CacheEntry, CacheHit, CacheLookupResult, CacheStats, CacheStore, Clock, EntryId,
    ExpiryPolicy, LookupOutcome, MissReason, QueryCacheConfig, Scope, ScopeFilter, ScoredEntry,
    SkipReason, SystemClock, WriteOutcome,
};
use crate::domain::DomainError;
use crate::infrastructure::embedding::HashingEmbeddingProvider;
use crate::infrastructure::metrics::{record_cache_lookup, record_cache_purge, record_cache_write};
use crate::infrastructure::query_cache::InMemoryCacheStore;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

/// Semantic cache in front of an expensive answer generator
///
/// Built once and shared as `Arc<QueryCacheService>`. The service holds no
/// conversation state; callers record each exchange themselves.
pub struct QueryCacheService {
    store: Arc<dyn CacheStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    config: QueryCacheConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl QueryCacheService {
    /// Create a service with the default configuration
    pub fn new(store: Arc<dyn CacheStore>, embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::build(store, embedding_provider, QueryCacheConfig::default())
    }

    /// Create a service with a custom configuration
    ///
    /// Fails with [`DomainError::Configuration`] when the configuration does
    /// not validate.
    pub fn with_config(
        store: Arc<dyn CacheStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: QueryCacheConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        Ok(Self::build(store, embedding_provider, config))
    }

    /// A service that never hits and never stores
    ///
    /// Used when the cache is switched off or could not be set up.
    pub fn disabled(config: QueryCacheConfig) -> Self {
        Self::build(
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(HashingEmbeddingProvider::default()),
            config.with_enabled(false),
        )
    }

    fn build(
        store: Arc<dyn CacheStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: QueryCacheConfig,
    ) -> Self {
        Self {
            store,
            embedding_provider,
            config,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    /// Cached response for a semantically equivalent query, if any
    pub async fn get(&self, query: &str, scope: &Scope) -> CacheLookupResult {
        self.lookup(query, scope).await.into_result()
    }

    /// Like [`Self::get`], reporting why a lookup missed
    pub async fn lookup(&self, query: &str, scope: &Scope) -> LookupOutcome {
        let outcome = self.run_lookup(query, scope).await;

        self.record_lookup(&outcome);
        record_cache_lookup(&outcome);

        match &outcome {
            LookupOutcome::Hit(hit) => debug!(
                "Query cache hit with similarity {:.4} for entry {} ({})",
                hit.similarity, hit.entry_id, scope
            ),
            LookupOutcome::Miss(reason) => {
                debug!("Query cache miss ({:?}) for query: {}", reason, preview(query))
            }
            LookupOutcome::Failed(e) => warn!("Query cache lookup failed, treating as miss: {}", e),
        }

        outcome
    }

    async fn run_lookup(&self, query: &str, scope: &Scope) -> LookupOutcome {
        if !self.config.enabled {
            return LookupOutcome::Miss(MissReason::Disabled);
        }

        if query.trim().is_empty() {
            return LookupOutcome::Miss(MissReason::EmptyQuery);
        }

        let vector = match self.embed(query).await {
            Ok(vector) => vector,
            Err(e) => return LookupOutcome::Failed(e),
        };

        let filter = self.config.scope_mode.lookup_filter(scope);
        let top_k = self.config.top_k;
        let store = self.store.clone();

        let candidates = self
            .run_store("query_nearest", async move {
                store.query_nearest(&vector, top_k, &filter).await
            })
            .await;

        match candidates {
            Ok(candidates) => self.select(candidates),
            Err(e) => LookupOutcome::Failed(e),
        }
    }

    /// Walk candidates closest first: the first one below the threshold ends
    /// the search, expired ones fall through to the next.
    fn select(&self, candidates: Vec<ScoredEntry>) -> LookupOutcome {
        let gate = self.config.gate();
        let expiry = self.config.expiry();
        let now = self.clock.now();
        let mut expired_age = None;

        for candidate in candidates {
            let similarity = gate.similarity(candidate.distance);

            if !gate.accepts_similarity(similarity) {
                let reason = match expired_age {
                    Some(age) => MissReason::Expired { age },
                    None => MissReason::BelowThreshold {
                        best_similarity: similarity,
                    },
                };
                return LookupOutcome::Miss(reason);
            }

            let created_at = candidate.entry.created_at();
            let age = ExpiryPolicy::age(created_at, now);

            if !expiry.is_fresh(created_at, now) {
                debug!(
                    "Skipping expired cache entry {} (age {}s)",
                    candidate.entry.id(),
                    age.as_secs()
                );
                expired_age.get_or_insert(age);
                continue;
            }

            let ScoredEntry { entry, .. } = candidate;

            return LookupOutcome::Hit(CacheHit {
                entry_id: entry.id().clone(),
                query_text: entry.query_text().to_string(),
                response_text: entry.response_text().to_string(),
                similarity,
                age,
            });
        }

        match expired_age {
            Some(age) => LookupOutcome::Miss(MissReason::Expired { age }),
            None => LookupOutcome::Miss(MissReason::NoCandidates),
        }
    }

    fn record_lookup(&self, outcome: &LookupOutcome) {
        match outcome {
            LookupOutcome::Hit(_) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
            }
            LookupOutcome::Miss(MissReason::Disabled) => {}
            LookupOutcome::Miss(_) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
            }
            LookupOutcome::Failed(_) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Cache a freshly generated response. Never fails.
    pub async fn put(&self, query: &str, response: &str, scope: &Scope) {
        self.store_response(query, response, scope, None).await;
    }

    /// Cache a response together with caller metadata. Never fails.
    pub async fn put_with_metadata(
        &self,
        query: &str,
        response: &str,
        scope: &Scope,
        metadata: serde_json::Value,
    ) {
        self.store_response(query, response, scope, Some(metadata))
            .await;
    }

    /// Like [`Self::put`], reporting what happened to the write
    pub async fn store_response(
        &self,
        query: &str,
        response: &str,
        scope: &Scope,
        metadata: Option<serde_json::Value>,
    ) -> WriteOutcome {
        let outcome = self.run_store_response(query, response, scope, metadata).await;

        record_cache_write(&outcome);

        match &outcome {
            WriteOutcome::Stored(id) => debug!("Cached response as {} ({})", id, scope),
            WriteOutcome::Skipped(reason) => debug!("Cache write skipped: {:?}", reason),
            WriteOutcome::Failed(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to cache response, continuing without it: {}", e)
            }
        }

        outcome
    }

    async fn run_store_response(
        &self,
        query: &str,
        response: &str,
        scope: &Scope,
        metadata: Option<serde_json::Value>,
    ) -> WriteOutcome {
        if !self.config.enabled {
            return WriteOutcome::Skipped(SkipReason::Disabled);
        }

        if query.trim().is_empty() {
            return WriteOutcome::Skipped(SkipReason::EmptyQuery);
        }

        let vector = match self.embed(query).await {
            Ok(vector) => vector,
            Err(e) => return WriteOutcome::Failed(e),
        };

        let mut entry = CacheEntry::new(query, vector, response, scope.clone(), self.clock.now());
        if let Some(metadata) = metadata {
            entry = entry.with_metadata(metadata);
        }

        let store = self.store.clone();
        let inserted: Result<EntryId, DomainError> = self
            .run_store("insert", async move { store.insert(entry).await })
            .await;

        match inserted {
            Ok(id) => WriteOutcome::Stored(id),
            Err(e) => WriteOutcome::Failed(e),
        }
    }

    /// Remove cached entries; `None` clears every scope
    ///
    /// Clearing an empty cache is not an error.
    pub async fn clear(&self, scope: Option<&Scope>) -> Result<usize, DomainError> {
        if !self.config.enabled {
            return Ok(0);
        }

        let filter = ScopeFilter::for_maintenance(scope);
        let store = self.store.clone();
        let removed = self
            .run_store("clear", async move { store.clear(&filter).await })
            .await?;

        info!("Cleared {} query cache entries", removed);

        Ok(removed)
    }

    /// Physically remove entries older than the TTL
    pub async fn purge_expired(&self, scope: Option<&Scope>) -> Result<usize, DomainError> {
        if !self.config.enabled {
            return Ok(0);
        }

        let Some(cutoff) = self.config.expiry().cutoff(self.clock.now()) else {
            return Ok(0);
        };

        let filter = ScopeFilter::for_maintenance(scope);
        let store = self.store.clone();
        let removed = self
            .run_store("purge_expired", async move {
                store.remove_created_before(cutoff, &filter).await
            })
            .await?;

        record_cache_purge(removed);

        if removed > 0 {
            info!("Purged {} expired query cache entries", removed);
        }

        Ok(removed)
    }

    /// Entry count for `scope` (all scopes for `None`) plus the counters
    pub async fn stats(&self, scope: Option<&Scope>) -> Result<CacheStats, DomainError> {
        let entry_count = if self.config.enabled {
            let filter = ScopeFilter::for_maintenance(scope);
            let store = self.store.clone();

            self.run_store("count", async move { store.count(&filter).await })
                .await?
        } else {
            0
        };

        Ok(CacheStats {
            enabled: self.config.enabled,
            entry_count,
            hit_count: self.counters.hits.load(Ordering::Relaxed),
            miss_count: self.counters.misses.load(Ordering::Relaxed),
            failure_count: self.counters.failures.load(Ordering::Relaxed),
            similarity_threshold: self.config.similarity_threshold,
            ttl_secs: self.config.ttl_secs,
        })
    }

    pub fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.failures.store(0, Ordering::Relaxed);
    }

    /// Start the periodic expiry sweep, if one is configured
    ///
    /// The first sweep runs immediately. The task ends once the last
    /// `Arc` to the service is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled || !self.config.expiry().is_enabled() {
            return None;
        }

        let period = self.config.sweep_interval()?;
        let service: Weak<Self> = Arc::downgrade(self);

        info!("Starting query cache expiry sweep every {}s", period.as_secs());

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                ticker.tick().await;

                let Some(service) = service.upgrade() else {
                    break;
                };

                if let Err(e) = service.purge_expired(None).await {
                    warn!("Query cache expiry sweep failed: {}", e);
                }
            }
        }))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let request = EmbeddingRequest::single(&self.config.embedding_model, text);

        let response = timeout(
            self.config.embedding_timeout(),
            self.embedding_provider.embed(request),
        )
        .await
        .map_err(|_| DomainError::timeout("embedding", self.config.embedding_timeout_ms))??;

        response
            .into_embeddings()
            .into_iter()
            .next()
            .map(Embedding::into_vector)
            .ok_or_else(|| {
                DomainError::provider(
                    self.embedding_provider.provider_name(),
                    "No embedding returned",
                )
            })
    }

    /// Run a store call on its own task, bounded by the store timeout
    ///
    /// A call that times out keeps running to completion in the background
    /// so a durable write is never torn half way.
    async fn run_store<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
    {
        let handle = tokio::spawn(call);

        match timeout(self.config.store_timeout(), handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(DomainError::internal(format!(
                "Cache store {} task failed: {}",
                operation, e
            ))),
            Err(_) => Err(DomainError::timeout(
                format!("cache store {}", operation),
                self.config.store_timeout_ms,
            )),
        }
    }
}

impl fmt::Debug for QueryCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCacheService")
            .field("embedding_provider", &self.embedding_provider.provider_name())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("counters", &self.counters)
            .finish()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
