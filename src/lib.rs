//! PMP Query Cache
//!
//! A semantic cache for question answering. A new query is served from the
//! cache when it lands close enough, in embedding space, to a previously
//! answered one and the stored answer has not expired:
//! - Pluggable embedding providers (OpenAI-compatible API, offline hashing)
//! - In-memory or persistent (append-only log) cache stores
//! - Session scoping, TTL expiry and failure isolation: cache problems only
//!   ever turn into misses

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{error, info};

use domain::{CacheStore, DomainError};
use infrastructure::{
    embedding::create_embedding_provider,
    query_cache::{FileCacheStore, InMemoryCacheStore},
    services::QueryCacheService,
};

/// Build the query cache described by `config`
///
/// Any setup problem (invalid settings, missing API key, unreadable store)
/// is returned as an error.
pub async fn try_create_query_cache(config: &AppConfig) -> Result<QueryCacheService, DomainError> {
    let cache_config = config.cache.clone();
    cache_config.validate()?;

    if !cache_config.enabled {
        info!("Query cache disabled by configuration");
        return Ok(QueryCacheService::disabled(cache_config));
    }

    let embedding_provider =
        create_embedding_provider(&config.embedding, cache_config.embedding_timeout())?;

    let store: Arc<dyn CacheStore> = match &cache_config.persist_directory {
        Some(dir) => {
            let store = FileCacheStore::open_with_metric(dir, cache_config.metric).await?;

            let stored = store.dimensions().await;
            let produced = embedding_provider.dimensions(&cache_config.embedding_model);
            if let (Some(stored), Some(produced)) = (stored, produced) {
                if stored != produced {
                    return Err(DomainError::configuration(format!(
                        "{} holds {}-dimension vectors but {} model {} produces {}; \
                         use another persist directory or delete this one",
                        dir.display(),
                        stored,
                        embedding_provider.provider_name(),
                        cache_config.embedding_model,
                        produced
                    )));
                }
            }

            info!("Using persistent query cache at {}", dir.display());
            Arc::new(store)
        }
        None => {
            info!("Using in-memory query cache");
            Arc::new(InMemoryCacheStore::with_metric(cache_config.metric))
        }
    };

    info!(
        "Query cache ready: provider={}, model={}, threshold={}, ttl={}s",
        embedding_provider.provider_name(),
        cache_config.embedding_model,
        cache_config.similarity_threshold,
        cache_config.ttl_secs
    );

    QueryCacheService::with_config(store, embedding_provider, cache_config)
}

/// Build the query cache, falling back to a disabled cache on setup errors
///
/// The application keeps answering queries without a cache rather than
/// failing to start. The expiry sweep is started when configured.
pub async fn create_query_cache(config: &AppConfig) -> Arc<QueryCacheService> {
    let service = match try_create_query_cache(config).await {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Query cache setup failed, running without cache: {}", e);
            Arc::new(QueryCacheService::disabled(config.cache.clone()))
        }
    };

    service.spawn_sweeper();

    service
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scope;
    use crate::infrastructure::embedding::EmbeddingSettings;

    fn hashing_config() -> AppConfig {
        AppConfig {
            embedding: EmbeddingSettings::hashing(64),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_in_memory_cache() {
        let cache = create_query_cache(&hashing_config()).await;

        cache.put("What is RAG?", "Retrieval-augmented generation.", &Scope::Global).await;

        assert!(cache.is_enabled());
        assert!(cache.get("what is rag", &Scope::Global).await.is_hit());
    }

    #[tokio::test]
    async fn test_invalid_config_degrades_to_disabled() {
        let mut config = hashing_config();
        config.cache.similarity_threshold = 2.0;

        assert!(try_create_query_cache(&config).await.is_err());

        let cache = create_query_cache(&config).await;
        assert!(!cache.is_enabled());

        cache.put("What is RAG?", "answer", &Scope::Global).await;
        assert!(!cache.get("What is RAG?", &Scope::Global).await.is_hit());
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let mut config = hashing_config();
        config.cache.enabled = false;

        let cache = try_create_query_cache(&config).await.unwrap();

        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn test_persistent_cache_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = hashing_config();
        config.cache.persist_directory = Some(tmp.path().to_path_buf());

        {
            let cache = try_create_query_cache(&config).await.unwrap();
            cache.put("What is RAG?", "Retrieval-augmented generation.", &Scope::Global).await;
        }

        let cache = try_create_query_cache(&config).await.unwrap();
        let result = cache.get("What is RAG?", &Scope::Global).await;

        assert_eq!(result.response_text(), Some("Retrieval-augmented generation."));
        assert_eq!(cache.stats(None).await.unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_store_from_other_embedder_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = hashing_config();
        config.cache.persist_directory = Some(tmp.path().to_path_buf());

        {
            let cache = try_create_query_cache(&config).await.unwrap();
            cache.put("What is RAG?", "Retrieval-augmented generation.", &Scope::Global).await;
        }

        config.embedding = EmbeddingSettings::hashing(32);

        match try_create_query_cache(&config).await {
            Err(DomainError::Configuration { message }) => {
                assert!(message.contains("64-dimension"));
                assert!(message.contains("produces 32"));
            }
            Err(other) => panic!("expected configuration error, got {}", other),
            Ok(_) => panic!("expected configuration error"),
        }

        let cache = create_query_cache(&config).await;
        assert!(!cache.is_enabled());
    }
}
