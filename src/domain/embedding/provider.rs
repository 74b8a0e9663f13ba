//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Maps text to fixed-length vectors (OpenAI, local hashing, ...)
///
/// Failures are reported as [`DomainError::Provider`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the default embedding model
    fn default_model(&self) -> &'static str;

    /// Embedding dimensions for a model, when known up front
    fn dimensions(&self, model: &str) -> Option<usize>;
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;
    use std::time::Duration;

    use super::*;
    use crate::domain::embedding::{Embedding, EmbeddingUsage};

    /// Test provider returning scripted vectors
    ///
    /// Texts registered with `with_vector` get that vector; any other text
    /// gets a one-hot vector chosen from the text's byte sum, so unrelated
    /// texts are usually orthogonal.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        name: &'static str,
        dimensions: usize,
        error: Option<String>,
        delay: Option<Duration>,
        vectors: RwLock<HashMap<String, Vec<f32>>>,
        calls: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        /// Create a new mock provider
        pub fn new(name: &'static str, dimensions: usize) -> Self {
            Self {
                name,
                dimensions,
                error: None,
                delay: None,
                vectors: RwLock::new(HashMap::new()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Fail every request with this message
        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Sleep before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Return `vector` for `text`
        pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.vectors.write().unwrap().insert(text.into(), vector);
            self
        }

        /// Get the number of embed calls
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            if let Some(vector) = self.vectors.read().unwrap().get(text) {
                return vector.clone();
            }

            let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
            let mut vector = vec![0.0; self.dimensions];
            vector[(hash as usize) % self.dimensions] = 1.0;
            vector
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name, error));
            }

            let inputs = request.inputs();
            let embeddings: Vec<Embedding> = inputs
                .iter()
                .enumerate()
                .map(|(idx, text)| Embedding::new(idx, self.vector_for(text)))
                .collect();

            let total_tokens = inputs.iter().map(|t| t.len() / 4).sum::<usize>() as u32;

            Ok(EmbeddingResponse::new(
                request.model().to_string(),
                embeddings,
                EmbeddingUsage::new(total_tokens, total_tokens),
            ))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn default_model(&self) -> &'static str {
            "mock-embedding"
        }

        fn dimensions(&self, _model: &str) -> Option<usize> {
            Some(self.dimensions)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_provider_scripted_vector() {
            let provider = MockEmbeddingProvider::new("test", 3).with_vector("hi", vec![0.5, 0.5, 0.0]);

            let response = provider
                .embed(EmbeddingRequest::single("mock-embedding", "hi"))
                .await
                .unwrap();

            assert_eq!(response.embeddings()[0].vector(), &[0.5, 0.5, 0.0]);
            assert_eq!(provider.calls(), 1);
        }

        #[tokio::test]
        async fn test_mock_provider_deterministic() {
            let provider = MockEmbeddingProvider::new("test", 16);

            let a = provider
                .embed(EmbeddingRequest::single("m", "Hello"))
                .await
                .unwrap();
            let b = provider
                .embed(EmbeddingRequest::single("m", "Hello"))
                .await
                .unwrap();

            assert_eq!(a.embeddings()[0].vector(), b.embeddings()[0].vector());
            assert_eq!(a.embeddings()[0].dimensions(), 16);
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new("test", 8).with_error("API error");

            let result = provider.embed(EmbeddingRequest::single("m", "Hello")).await;

            assert!(matches!(result, Err(DomainError::Provider { .. })));
        }
    }
}
