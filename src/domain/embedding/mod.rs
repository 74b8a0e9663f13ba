//! Embedding provider domain models and traits
//!
//! The provider itself is an external service; this module only fixes the
//! contract the query cache consumes.

mod provider;
mod request;
mod response;

pub use provider::EmbeddingProvider;
pub use request::{EmbeddingInput, EmbeddingRequest};
pub use response::{
    cosine_similarity, euclidean_distance, Embedding, EmbeddingResponse, EmbeddingUsage,
};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
