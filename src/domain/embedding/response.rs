//! Embedding response types and vector metrics

use serde::{Deserialize, Serialize};

/// A single embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Index of this embedding in the batch
    index: usize,
    embedding: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding
    pub fn new(index: usize, embedding: Vec<f32>) -> Self {
        Self { index, embedding }
    }

    /// Get the index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the embedding vector
    pub fn vector(&self) -> &[f32] {
        &self.embedding
    }

    /// Get the number of dimensions
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Consume and return the vector
    pub fn into_vector(self) -> Vec<f32> {
        self.embedding
    }
}

/// Euclidean (L2) distance between two vectors
///
/// Vectors of different length, or empty vectors, are infinitely far apart.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

impl EmbeddingUsage {
    /// Create new usage stats
    pub fn new(prompt_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            total_tokens,
        }
    }

    /// Get the prompt tokens
    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    /// Get the total tokens
    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }
}

/// Response from an embedding request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    model: String,
    data: Vec<Embedding>,
    usage: EmbeddingUsage,
}

impl EmbeddingResponse {
    /// Create a new embedding response
    pub fn new(model: String, data: Vec<Embedding>, usage: EmbeddingUsage) -> Self {
        Self { model, data, usage }
    }

    /// Get the model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the embeddings
    pub fn embeddings(&self) -> &[Embedding] {
        &self.data
    }

    /// First embedding (the only one for single-input requests)
    pub fn first(&self) -> Option<&Embedding> {
        self.data.first()
    }

    /// Get the usage stats
    pub fn usage(&self) -> &EmbeddingUsage {
        &self.usage
    }

    /// Consume and return the embeddings
    pub fn into_embeddings(self) -> Vec<Embedding> {
        self.data
    }
}
