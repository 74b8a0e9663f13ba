use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{HashingEmbeddingProvider, HttpClient, OpenAiEmbeddingProvider};
use crate::domain::{DomainError, EmbeddingProvider};

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Which embedding backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    OpenAi,
    Hashing,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// API key; falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint root
    #[serde(default)]
    pub base_url: Option<String>,

    /// Vector size for the hashing provider
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_dimensions() -> usize {
    256
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            api_key: None,
            base_url: None,
            dimensions: default_dimensions(),
        }
    }
}

impl EmbeddingSettings {
    pub fn hashing(dimensions: usize) -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            dimensions,
            ..Self::default()
        }
    }

    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Build the configured embedding provider
///
/// `timeout` bounds each HTTP call made by remote providers.
pub fn create_embedding_provider(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    match settings.provider {
        EmbeddingProviderKind::OpenAi => {
            let api_key = settings.resolve_api_key().ok_or_else(|| {
                DomainError::configuration(format!(
                    "OpenAI embeddings require an API key (embedding.api_key or {})",
                    OPENAI_API_KEY_ENV
                ))
            })?;

            let client = HttpClient::with_timeout(timeout)?;
            let provider = match &settings.base_url {
                Some(base_url) => OpenAiEmbeddingProvider::with_base_url(client, api_key, base_url),
                None => OpenAiEmbeddingProvider::new(client, api_key),
            };

            Ok(Arc::new(provider))
        }

        EmbeddingProviderKind::Hashing => {
            if settings.dimensions == 0 {
                return Err(DomainError::configuration(
                    "embedding.dimensions must be greater than zero",
                ));
            }

            Ok(Arc::new(HashingEmbeddingProvider::new(settings.dimensions)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_deserialize() {
        let settings: EmbeddingSettings =
            serde_json::from_str(r#"{"provider": "hashing", "dimensions": 64}"#).unwrap();

        assert_eq!(settings.provider, EmbeddingProviderKind::Hashing);
        assert_eq!(settings.dimensions, 64);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: EmbeddingSettings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.provider, EmbeddingProviderKind::OpenAi);
        assert_eq!(settings.dimensions, 256);
    }

    #[test]
    fn test_create_hashing_provider() {
        let provider =
            create_embedding_provider(&EmbeddingSettings::hashing(32), Duration::from_secs(1))
                .unwrap();

        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.dimensions("any"), Some(32));
    }

    #[test]
    fn test_hashing_zero_dimensions_rejected() {
        let result =
            create_embedding_provider(&EmbeddingSettings::hashing(0), Duration::from_secs(1));

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_create_openai_with_explicit_key() {
        let settings = EmbeddingSettings {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:9999".to_string()),
            ..EmbeddingSettings::default()
        };

        let provider = create_embedding_provider(&settings, Duration::from_secs(1)).unwrap();

        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_blank_key_is_not_a_key() {
        let settings = EmbeddingSettings {
            api_key: Some("   ".to_string()),
            ..EmbeddingSettings::default()
        };

        // env fallback is only consulted when the key is unset
        assert!(settings.resolve_api_key().is_none());
    }
}
