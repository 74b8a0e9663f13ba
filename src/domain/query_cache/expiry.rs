//! Time-based admissibility of cache entries

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Decides whether an entry is still young enough to serve
///
/// A TTL of zero disables expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    ttl_secs: u64,
}

impl ExpiryPolicy {
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl_secs }
    }

    pub fn never() -> Self {
        Self { ttl_secs: 0 }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl_secs > 0
    }

    /// Whole seconds elapsed since `created_at`, never negative
    pub fn age_secs(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        (now - created_at).num_seconds().max(0) as u64
    }

    pub fn age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (now - created_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.is_enabled() {
            return true;
        }

        Self::age_secs(created_at, now) <= self.ttl_secs
    }

    /// Entries created strictly before this instant are expired at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_enabled() {
            return None;
        }

        let secs = i64::try_from(self.ttl_secs).ok()?.checked_add(1)?;
        // an entry aged ttl + 1 whole seconds is the first one rejected
        now.checked_sub_signed(chrono::Duration::try_seconds(secs)?)
            .map(|t| t + chrono::Duration::nanoseconds(1))
    }
}
