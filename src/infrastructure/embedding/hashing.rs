//! Offline embedding provider based on feature hashing
//!
//! Lowercased word tokens are hashed (FNV-1a) into a fixed number of buckets
//! and the resulting vector is L2-normalised. Texts sharing words end up
//! close together; texts with no words in common are (almost) orthogonal.
//! It captures lexical overlap only, which is enough for local runs and
//! demos without an API key.

use async_trait::async_trait;

use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;

const DEFAULT_DIMENSIONS: usize = 256;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            // sign bit spreads collisions instead of piling them up
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let inputs = request.inputs();

        let embeddings: Vec<Embedding> = inputs
            .iter()
            .enumerate()
            .map(|(idx, text)| Embedding::new(idx, self.vectorize(text)))
            .collect();

        let tokens = inputs.iter().map(|t| tokenize(t).count()).sum::<usize>() as u32;

        Ok(EmbeddingResponse::new(
            request.model().to_string(),
            embeddings,
            EmbeddingUsage::new(tokens, tokens),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn default_model(&self) -> &'static str {
        "hashing-bow"
    }

    fn dimensions(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}
