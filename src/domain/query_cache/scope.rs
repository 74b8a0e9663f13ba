//! Session scoping of cache entries

use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition an entry belongs to, or a lookup is made from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible to every session
    #[default]
    Global,
    /// Belongs to a single conversation session
    Session(String),
}

impl Scope {
    pub fn session(id: impl Into<String>) -> Self {
        Self::Session(id.into())
    }

    /// Build a scope from an optional session id; blank ids mean global
    pub fn from_session_id(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::Session(id.to_string()),
            _ => Self::Global,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Session(id) => Some(id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Session(id) => write!(f, "session:{}", id),
        }
    }
}

/// How a lookup's scope restricts which entries it may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Scope is recorded but ignored for lookups
    Shared,
    /// A session sees its own entries plus global ones
    #[default]
    Partitioned,
    /// A lookup sees only entries with exactly its scope
    Isolated,
}

impl ScopeMode {
    /// Filter applied to nearest-neighbour queries made from `scope`
    pub fn lookup_filter(&self, scope: &Scope) -> ScopeFilter {
        match self {
            Self::Shared => ScopeFilter::All,
            Self::Partitioned => ScopeFilter::VisibleTo(scope.clone()),
            Self::Isolated => ScopeFilter::Exact(scope.clone()),
        }
    }
}

/// Entry selection rule understood by cache stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    All,
    /// Entries whose scope equals the given one
    Exact(Scope),
    /// Entries of the given scope plus global entries
    VisibleTo(Scope),
}

impl ScopeFilter {
    /// `None` selects everything, `Some(scope)` selects exactly that scope
    pub fn for_maintenance(scope: Option<&Scope>) -> Self {
        match scope {
            Some(scope) => Self::Exact(scope.clone()),
            None => Self::All,
        }
    }

    pub fn matches(&self, entry_scope: &Scope) -> bool {
        match self {
            Self::All => true,
            Self::Exact(scope) => entry_scope == scope,
            Self::VisibleTo(scope) => entry_scope.is_global() || entry_scope == scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_id() {
        assert_eq!(Scope::from_session_id(None), Scope::Global);
        assert_eq!(Scope::from_session_id(Some("  ")), Scope::Global);
        assert_eq!(Scope::from_session_id(Some("abc")), Scope::session("abc"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::Global.to_string(), "global");
        assert_eq!(Scope::session("a").to_string(), "session:a");
    }

    #[test]
    fn test_partitioned_sees_own_and_global() {
        let filter = ScopeMode::Partitioned.lookup_filter(&Scope::session("a"));

        assert!(filter.matches(&Scope::session("a")));
        assert!(filter.matches(&Scope::Global));
        assert!(!filter.matches(&Scope::session("b")));
    }

    #[test]
    fn test_partitioned_global_lookup_sees_only_global() {
        let filter = ScopeMode::Partitioned.lookup_filter(&Scope::Global);

        assert!(filter.matches(&Scope::Global));
        assert!(!filter.matches(&Scope::session("a")));
    }

    #[test]
    fn test_isolated_requires_exact_match() {
        let filter = ScopeMode::Isolated.lookup_filter(&Scope::session("a"));

        assert!(filter.matches(&Scope::session("a")));
        assert!(!filter.matches(&Scope::Global));
    }

    #[test]
    fn test_shared_sees_everything() {
        let filter = ScopeMode::Shared.lookup_filter(&Scope::session("a"));

        assert!(filter.matches(&Scope::session("b")));
        assert!(filter.matches(&Scope::Global));
    }

    #[test]
    fn test_maintenance_filter() {
        assert_eq!(ScopeFilter::for_maintenance(None), ScopeFilter::All);
        assert_eq!(
            ScopeFilter::for_maintenance(Some(&Scope::Global)),
            ScopeFilter::Exact(Scope::Global)
        );
    }

    #[test]
    fn test_scope_serde() {
        assert_eq!(serde_json::to_value(Scope::Global).unwrap(), serde_json::json!("global"));
        assert_eq!(
            serde_json::to_value(Scope::session("s1")).unwrap(),
            serde_json::json!({"session": "s1"})
        );

        let mode: ScopeMode = serde_json::from_str("\"isolated\"").unwrap();
        assert_eq!(mode, ScopeMode::Isolated);
    }
}
