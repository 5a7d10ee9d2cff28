//! Immutable statistics snapshot.

use std::time::Duration;

/// Aggregated statistics for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub n: u32,
    pub count: u64,
    pub average: Duration,
}

impl IndexStats {
    /// Average latency in fractional milliseconds.
    pub fn average_ms(&self) -> f64 {
        self.average.as_nanos() as f64 / 1_000_000.0
    }
}

/// Point-in-time copy of the aggregator state, sorted ascending by `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub per_n: Vec<IndexStats>,
}

impl StatsSnapshot {
    /// Entry for a given index, if it was ever recorded.
    pub fn get(&self, n: u32) -> Option<&IndexStats> {
        self.per_n
            .binary_search_by_key(&n, |s| s.n)
            .ok()
            .map(|i| &self.per_n[i])
    }

    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }
}
