//! Cached, concurrency-safe Fibonacci evaluator.
//!
//! # Responsibilities
//! - Validate the requested index against the configured cap
//! - Serve cached values without re-entering the compute path
//! - On a miss, resume from the nearest cached consecutive pair and store
//!   every value produced on the way
//! - Hand one observation per successful call to the telemetry reporter
//!
//! # Design Decisions
//! - The store is injected, not global; every evaluator owns its cache
//! - Store failures degrade to direct evaluation and never reach the caller
//! - Concurrent first-time requests for the same index may both compute and
//!   write the same value

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::compute::sequence::{self, Seed, MAX_FIB_INDEX};
use crate::compute::store::CacheStore;
use crate::observability::metrics;
use crate::telemetry::{Observation, TelemetryReporter};

/// Errors returned to callers of [`Evaluator::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// The index is negative or above the cap.
    #[error("n out of range: {n} (allowed 0..={max})")]
    InvalidArgument { n: i64, max: u32 },
}

/// Point-in-time copy of the evaluator's cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Fibonacci evaluator with an injected cache store.
pub struct Evaluator {
    store: Arc<dyn CacheStore>,
    max_n: u32,
    reporter: Option<TelemetryReporter>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Evaluator {
    /// Create an evaluator over `store`, capped at [`MAX_FIB_INDEX`], with no
    /// telemetry attached.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            max_n: MAX_FIB_INDEX,
            reporter: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Lower the index cap. Values above [`MAX_FIB_INDEX`] are clamped.
    pub fn with_max_n(mut self, max_n: u32) -> Self {
        self.max_n = max_n.min(MAX_FIB_INDEX);
        self
    }

    /// Attach a reporter that receives one observation per computation.
    pub fn with_reporter(mut self, reporter: TelemetryReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// The effective index cap.
    pub fn max_n(&self) -> u32 {
        self.max_n
    }

    /// Compute `Fib(n)`.
    ///
    /// Returns immediately after the value is known; the observation is
    /// delivered on a detached task.
    pub fn compute(&self, n: i32) -> Result<i64, ComputeError> {
        let index = self.validate(n)?;

        let start = Instant::now();
        let value = self.evaluate(index);
        let elapsed = start.elapsed();

        metrics::record_compute(elapsed);
        tracing::debug!(n = index, value, elapsed = ?elapsed, "Computed Fib(n)");

        if let Some(reporter) = &self.reporter {
            reporter.report(Observation::new(index, elapsed));
        }

        Ok(value)
    }

    /// Current hit/miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of entries in the underlying store.
    pub fn cached_len(&self) -> usize {
        self.store.len()
    }

    fn validate(&self, n: i32) -> Result<u32, ComputeError> {
        match u32::try_from(n) {
            Ok(index) if index <= self.max_n => Ok(index),
            _ => {
                tracing::info!(n, max = self.max_n, "Rejected out-of-range n");
                metrics::record_compute_rejected();
                Err(ComputeError::InvalidArgument {
                    n: i64::from(n),
                    max: self.max_n,
                })
            }
        }
    }

    fn evaluate(&self, index: u32) -> i64 {
        match self.store.get(index) {
            Ok(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("hit");
                tracing::trace!(n = index, value, "Cache hit");
                return value;
            }
            Ok(None) => {
                metrics::record_cache_lookup("miss");
            }
            Err(e) => {
                metrics::record_cache_lookup("error");
                tracing::warn!(n = index, error = %e, "Cache read failed, computing directly");
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut write_failed = false;
        let mut store_value = |i: u32, v: i64| {
            if write_failed {
                return;
            }
            if let Err(e) = self.store.put(i, v) {
                write_failed = true;
                tracing::warn!(n = i, error = %e, "Cache write failed");
            }
        };

        if index <= 1 {
            let value = i64::from(index);
            store_value(index, value);
            return value;
        }

        let seed = self.nearest_seed(index);
        sequence::advance(seed, index, store_value)
    }

    /// Highest cached consecutive pair below `index`, or the base case.
    fn nearest_seed(&self, index: u32) -> Seed {
        for k in (1..index).rev() {
            let current = match self.store.get(k) {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(_) => break,
            };
            match self.store.get(k - 1) {
                Ok(Some(prev)) => {
                    return Seed {
                        index: k,
                        prev,
                        current,
                    }
                }
                Ok(None) => continue,
                Err(_) => break,
            }
        }
        Seed::BASE
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("max_n", &self.max_n)
            .field("cached", &self.store.len())
            .field("telemetry", &self.reporter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::store::{MemoryStore, StoreError};
    use crate::resilience::RetryPolicy;
    use crate::rpc::RpcError;
    use crate::telemetry::ObservationSink;
    use futures_util::future::BoxFuture;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn evaluator() -> Evaluator {
        Evaluator::new(Arc::new(MemoryStore::new()))
    }

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, _n: u32) -> Result<Option<i64>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn put(&self, _n: u32, _value: i64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn len(&self) -> usize {
            0
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<Observation>);

    impl ObservationSink for ChannelSink {
        fn deliver(&self, observation: Observation) -> BoxFuture<'_, Result<(), RpcError>> {
            let _ = self.0.send(observation);
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_known_values() {
        let eval = evaluator();
        assert_eq!(eval.compute(0).unwrap(), 0);
        assert_eq!(eval.compute(1).unwrap(), 1);
        assert_eq!(eval.compute(10).unwrap(), 55);
        assert_eq!(eval.compute(92).unwrap(), 7_540_113_804_746_346_429);
    }

    #[test]
    fn test_every_index_matches_sequence() {
        let eval = evaluator();
        // Descending order exercises both the seed search and fresh runs
        for n in (0..=92).rev() {
            assert_eq!(eval.compute(n).unwrap(), sequence::fib(n as u32));
        }
        for n in 0..=92 {
            assert_eq!(eval.compute(n).unwrap(), sequence::fib(n as u32));
        }
    }

    #[test]
    fn test_rejects_out_of_range_without_mutation() {
        let eval = evaluator();

        let err = eval.compute(93).unwrap_err();
        assert_eq!(err, ComputeError::InvalidArgument { n: 93, max: 92 });
        assert!(err.to_string().contains("93"));

        let err = eval.compute(-1).unwrap_err();
        assert_eq!(err, ComputeError::InvalidArgument { n: -1, max: 92 });

        assert!(eval.compute(i32::MAX).is_err());
        assert_eq!(eval.cached_len(), 0);
        assert_eq!(eval.cache_stats(), CacheStats::default());
    }

    #[test]
    fn test_lowered_cap() {
        let eval = evaluator().with_max_n(20);
        assert_eq!(eval.compute(20).unwrap(), 6765);
        assert!(eval.compute(21).is_err());

        let eval = evaluator().with_max_n(500);
        assert_eq!(eval.max_n(), MAX_FIB_INDEX);
    }

    #[test]
    fn test_second_call_hits_cache() {
        let eval = evaluator();
        let first = eval.compute(40).unwrap();
        assert_eq!(eval.cache_stats(), CacheStats { hits: 0, misses: 1 });

        let second = eval.compute(40).unwrap();
        assert_eq!(first, second);
        assert_eq!(eval.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_miss_stores_intermediates() {
        let eval = evaluator();
        eval.compute(30).unwrap();
        // 2..=30 written on the way
        assert_eq!(eval.cached_len(), 29);

        // Intermediate value is served from cache
        assert_eq!(eval.compute(17).unwrap(), 1597);
        assert_eq!(eval.cache_stats().hits, 1);
    }

    #[test]
    fn test_resumes_from_cached_pair() {
        let store = Arc::new(MemoryStore::new());
        // Deliberately wrong values make the resume point observable
        store.put(10, 1000).unwrap();
        store.put(9, 100).unwrap();
        let eval = Evaluator::new(store);
        assert_eq!(eval.compute(11).unwrap(), 1100);
    }

    #[test]
    fn test_broken_store_falls_back() {
        let eval = Evaluator::new(Arc::new(BrokenStore));
        assert_eq!(eval.compute(1).unwrap(), 1);
        assert_eq!(eval.compute(50).unwrap(), 12_586_269_025);
        assert_eq!(eval.compute(50).unwrap(), 12_586_269_025);
        assert_eq!(eval.cache_stats().hits, 0);
    }

    #[test]
    fn test_concurrent_distinct_indices() {
        let eval = Arc::new(evaluator());
        let handles: Vec<_> = (0..=92)
            .map(|n| {
                let eval = eval.clone();
                std::thread::spawn(move || (n, eval.compute(n).unwrap()))
            })
            .collect();

        for handle in handles {
            let (n, value) = handle.join().unwrap();
            assert_eq!(value, sequence::fib(n as u32));
        }
    }

    #[test]
    fn test_concurrent_same_index() {
        let eval = Arc::new(evaluator());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let eval = eval.clone();
                std::thread::spawn(move || eval.compute(88).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), sequence::fib(88));
        }
        let stats = eval.cache_stats();
        assert_eq!(stats.hits + stats.misses, 16);
    }

    #[tokio::test]
    async fn test_emits_one_observation_per_success() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = TelemetryReporter::new(
            Arc::new(ChannelSink(tx)),
            RetryPolicy::default(),
            Duration::from_secs(2),
        );
        let eval = evaluator().with_reporter(reporter);

        eval.compute(12).unwrap();
        assert!(eval.compute(100).is_err());

        let observation = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(observation.n, 12);

        // The rejected call produced nothing
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
