//! Results of cache lookups and writes

use std::time::Duration;

use super::EntryId;
use crate::domain::DomainError;

/// A served cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub entry_id: EntryId,
    /// Text of the query that was originally answered
    pub query_text: String,
    pub response_text: String,
    pub similarity: f32,
    /// Age of the matched entry at lookup time
    pub age: Duration,
}

/// Caller-facing lookup result
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookupResult {
    Hit(CacheHit),
    Miss,
}

impl CacheLookupResult {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn response_text(&self) -> Option<&str> {
        match self {
            Self::Hit(hit) => Some(&hit.response_text),
            Self::Miss => None,
        }
    }

    pub fn into_response(self) -> Option<String> {
        match self {
            Self::Hit(hit) => Some(hit.response_text),
            Self::Miss => None,
        }
    }
}

/// Why a lookup did not produce a hit
#[derive(Debug, Clone, PartialEq)]
pub enum MissReason {
    Disabled,
    EmptyQuery,
    /// Store had no entry visible to the lookup scope
    NoCandidates,
    /// Closest candidate was not similar enough
    BelowThreshold { best_similarity: f32 },
    /// Every similar candidate was too old
    Expired { age: Duration },
}

/// Detailed lookup outcome, including swallowed failures
#[derive(Debug)]
pub enum LookupOutcome {
    Hit(CacheHit),
    Miss(MissReason),
    /// Embedding or store failure; reported to callers as a miss
    Failed(DomainError),
}

impl LookupOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss(MissReason::Disabled) => "disabled",
            Self::Miss(_) => "miss",
            Self::Failed(_) => "error",
        }
    }

    pub fn into_result(self) -> CacheLookupResult {
        match self {
            Self::Hit(hit) => CacheLookupResult::Hit(hit),
            Self::Miss(_) | Self::Failed(_) => CacheLookupResult::Miss,
        }
    }
}

/// Why a write was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    EmptyQuery,
}

/// Detailed write outcome, including swallowed failures
#[derive(Debug)]
pub enum WriteOutcome {
    Stored(EntryId),
    Skipped(SkipReason),
    Failed(DomainError),
}

impl WriteOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored(_) => "stored",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit() -> CacheHit {
        CacheHit {
            entry_id: EntryId::from("qc:1"),
            query_text: "q".into(),
            response_text: "answer".into(),
            similarity: 1.0,
            age: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_failed_lookup_is_a_miss_for_callers() {
        let outcome = LookupOutcome::Failed(DomainError::storage("corrupt index"));

        assert_eq!(outcome.label(), "error");
        assert_eq!(outcome.into_result(), CacheLookupResult::Miss);
    }

    #[test]
    fn test_hit_result_accessors() {
        let result = LookupOutcome::Hit(hit()).into_result();

        assert!(result.is_hit());
        assert_eq!(result.response_text(), Some("answer"));
        assert_eq!(result.into_response(), Some("answer".to_string()));
    }

    #[test]
    fn test_labels() {
        assert_eq!(LookupOutcome::Miss(MissReason::Disabled).label(), "disabled");
        assert_eq!(LookupOutcome::Miss(MissReason::NoCandidates).label(), "miss");
        assert_eq!(WriteOutcome::Skipped(SkipReason::EmptyQuery).label(), "skipped");
        assert!(WriteOutcome::Stored(EntryId::from("qc:1")).is_stored());
    }
}
