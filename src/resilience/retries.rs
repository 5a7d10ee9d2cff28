//! Retry logic.
//!
//! # Responsibilities
//! - Describe a retry schedule (attempt budget, backoff shape)
//! - Run any fallible async operation under that schedule
//! - Stop immediately on errors the caller classifies as permanent
//!
//! # Design Decisions
//! - The policy knows nothing about the operation or its error type; the
//!   caller supplies the retryability predicate
//! - No sleep after the final attempt

use std::future::Future;
use std::time::Duration;

use crate::config::TelemetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Parametric retry schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is one more.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per retry.
    pub multiplier: u32,
    /// Upper bound on a single delay (before jitter).
    pub max_delay: Duration,
    /// Fraction of each delay added as random jitter (0 disables).
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2,
            max_delay: Duration::from_millis(800),
            jitter_ratio: 0.0,
        }
    }
}

impl From<&TelemetryConfig> for RetryPolicy {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }
}

/// Result of a retried operation along with how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        calculate_backoff(
            retry,
            self.base_delay,
            self.multiplier,
            self.max_delay,
            self.jitter_ratio,
        )
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` receives the 1-based attempt number. `is_retryable` decides
    /// whether an error is worth another attempt.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    if attempt >= max_attempts || !is_retryable(&e) {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }

                    let delay = self.delay_for(attempt);
                    tracing::debug!(attempt, delay = ?delay, error = %e, "Retrying after transient error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_four_attempts() {
        let policy = RetryPolicy::default();
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let s = stamps.clone();
        let outcome: RetryOutcome<(), _> = policy
            .run(
                move |_| {
                    s.lock().unwrap().push(Instant::now());
                    async { Err(TestError::Transient) }
                },
                transient,
            )
            .await;

        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.result, Err(TestError::Transient));

        let stamps = stamps.lock().unwrap();
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 3);
        assert!(gaps.windows(2).all(|w| w[0] <= w[1]), "delays must not decrease: {:?}", gaps);
        assert!(gaps[0] >= Duration::from_millis(100));
        assert!(gaps[2] >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops_immediately() {
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        let outcome: RetryOutcome<(), _> = RetryPolicy::default()
            .run(
                move |_| {
                    *c.lock().unwrap() += 1;
                    async { Err(TestError::Permanent) }
                },
                transient,
            )
            .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_mid_schedule() {
        let outcome = RetryPolicy::default()
            .run(
                |attempt| async move {
                    if attempt < 3 {
                        Err(TestError::Transient)
                    } else {
                        Ok(attempt)
                    }
                },
                transient,
            )
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.into_result(), Ok(3));
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let outcome: RetryOutcome<(), _> = RetryPolicy::no_retry()
            .run(|_| async { Err(TestError::Transient) }, transient)
            .await;
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_policy_from_config() {
        let config = TelemetryConfig {
            max_retries: 5,
            base_delay_ms: 50,
            ..TelemetryConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
    }
}
