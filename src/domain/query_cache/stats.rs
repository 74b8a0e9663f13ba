//! Cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    /// Entries in the requested scope (all scopes when none was given)
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    /// Swallowed embedding/storage failures; failed lookups also count as misses
    pub failure_count: u64,
    pub similarity_threshold: f32,
    pub ttl_secs: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hit_count + self.miss_count;

        if total == 0 {
            return 0.0;
        }

        self.hit_count as f32 / total as f32
    }

    pub fn ttl_hours(&self) -> f32 {
        self.ttl_secs as f32 / 3600.0
    }
}
