//! Concurrent accumulator for compute observations.
//!
//! # Responsibilities
//! - Merge `(n, duration)` records from any number of concurrent callers
//! - Hand out consistent, sorted snapshots
//!
//! # Design Decisions
//! - One lock guards all counters so a snapshot never sees half a record
//! - Averages are derived at snapshot time; a record is O(log k)
//! - Neither operation fails; a poisoned lock is recovered
//! - Keys are whatever callers record; the stats RPC caps them at
//!   `MAX_FIB_INDEX`, so the map holds at most 93 entries

use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::observability::metrics;
use crate::rpc::RpcError;
use crate::stats::snapshot::{IndexStats, StatsSnapshot};
use crate::telemetry::{Observation, ObservationSink};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: u64,
    total: Duration,
}

#[derive(Debug, Default)]
struct Accumulator {
    total_requests: u64,
    per_n: BTreeMap<u32, Tally>,
}

/// Thread-safe statistics aggregator.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: RwLock<Accumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    pub fn record(&self, n: u32, duration: Duration) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.total_requests += 1;
            let tally = state.per_n.entry(n).or_default();
            tally.count += 1;
            tally.total = tally.total.saturating_add(duration);
        }

        metrics::record_stats_record();
        tracing::debug!(n, duration = ?duration, "Recorded observation");
    }

    /// Consistent copy of everything recorded so far.
    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        let per_n = state
            .per_n
            .iter()
            .map(|(&n, tally)| IndexStats {
                n,
                count: tally.count,
                average: average(tally),
            })
            .collect();

        StatsSnapshot {
            total_requests: state.total_requests,
            per_n,
        }
    }
}

fn average(tally: &Tally) -> Duration {
    if tally.count == 0 {
        return Duration::ZERO;
    }
    let nanos = tally.total.as_nanos() / u128::from(tally.count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// In-process delivery, used when compute and stats share a process.
impl ObservationSink for Aggregator {
    fn deliver(&self, observation: Observation) -> BoxFuture<'_, Result<(), RpcError>> {
        self.record(observation.n, observation.duration);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Aggregator::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.per_n.is_empty());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_sorted_and_averaged() {
        let agg = Aggregator::new();
        agg.record(30, Duration::from_millis(3));
        agg.record(5, Duration::from_millis(1));
        agg.record(30, Duration::from_millis(5));
        agg.record(12, Duration::from_millis(2));

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        let ns: Vec<u32> = snapshot.per_n.iter().map(|s| s.n).collect();
        assert_eq!(ns, vec![5, 12, 30]);

        let thirty = snapshot.get(30).unwrap();
        assert_eq!(thirty.count, 2);
        assert_eq!(thirty.average, Duration::from_millis(4));
        assert!((thirty.average_ms() - 4.0).abs() < 1e-9);
        assert!(snapshot.get(7).is_none());
    }

    #[test]
    fn test_concurrent_records_same_index() {
        let agg = Arc::new(Aggregator::new());
        let k = 64u64;

        let handles: Vec<_> = (1..=k)
            .map(|i| {
                let agg = agg.clone();
                std::thread::spawn(move || agg.record(7, Duration::from_micros(i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = agg.snapshot();
        let entry = snapshot.get(7).unwrap();
        assert_eq!(entry.count, k);
        let sum: u64 = (1..=k).sum();
        assert_eq!(entry.average, Duration::from_micros(sum) / k as u32);
        assert_eq!(snapshot.total_requests, k);
    }

    #[test]
    fn test_snapshot_never_sees_partial_records() {
        let agg = Arc::new(Aggregator::new());

        let writers: Vec<_> = (0..8u32)
            .map(|w| {
                let agg = agg.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        agg.record((w + i) % 20, Duration::from_nanos(100));
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let snapshot = agg.snapshot();
            let counted: u64 = snapshot.per_n.iter().map(|s| s.count).sum();
            assert_eq!(counted, snapshot.total_requests);
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(agg.snapshot().total_requests, 4000);
    }

    #[tokio::test]
    async fn test_in_process_sink() {
        let agg = Aggregator::new();
        agg.deliver(Observation::new(3, Duration::from_millis(1)))
            .await
            .unwrap();
        assert_eq!(agg.snapshot().get(3).unwrap().count, 1);
    }
}
