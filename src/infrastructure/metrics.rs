//! Query cache metrics
//!
//! Counters go through the `metrics` facade; installing a recorder or
//! exporter is left to the embedding application.

use metrics::counter;

use crate::domain::query_cache::{LookupOutcome, WriteOutcome};

/// Record a cache lookup by outcome (`hit`, `miss`, `disabled`, `error`)
pub fn record_cache_lookup(outcome: &LookupOutcome) {
    let labels = [("outcome", outcome.label().to_string())];

    counter!("query_cache_lookups_total", &labels).increment(1);
}

/// Record a cache write by outcome (`stored`, `skipped`, `error`)
pub fn record_cache_write(outcome: &WriteOutcome) {
    let labels = [("outcome", outcome.label().to_string())];

    counter!("query_cache_writes_total", &labels).increment(1);
}

/// Record entries removed by expiry purges
pub fn record_cache_purge(removed: usize) {
    counter!("query_cache_purged_entries_total").increment(removed as u64);
}
