//! Cache entry model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// Unique identifier of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        Self(format!("qc:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A previously answered query
///
/// Entries are never mutated after insertion; a newer answer to the same
/// question is simply another entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    id: EntryId,
    query_text: String,
    query_vector: Vec<f32>,
    response_text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl CacheEntry {
    pub fn new(
        query_text: impl Into<String>,
        query_vector: Vec<f32>,
        response_text: impl Into<String>,
        scope: Scope,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            query_text: query_text.into(),
            query_vector,
            response_text: response_text.into(),
            created_at,
            scope,
            metadata: None,
        }
    }

    /// Attach caller-supplied metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn query_vector(&self) -> &[f32] {
        &self.query_vector
    }

    pub fn dimensions(&self) -> usize {
        self.query_vector.len()
    }

    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }
}
