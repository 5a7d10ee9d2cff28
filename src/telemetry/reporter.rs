//! Fire-and-forget observation delivery.

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TelemetryConfig;
use crate::observability::metrics;
use crate::resilience::{with_deadline, RetryPolicy};
use crate::rpc::RpcError;
use crate::telemetry::Observation;

/// Destination for observations.
pub trait ObservationSink: Send + Sync + 'static {
    /// Deliver one observation. Errors are classified with
    /// [`RpcError::is_transient`].
    fn deliver(&self, observation: Observation) -> BoxFuture<'_, Result<(), RpcError>>;
}

/// How a single report ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Dropped { attempts: u32, error: RpcError },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts } => *attempts,
            DeliveryOutcome::Dropped { attempts, .. } => *attempts,
        }
    }
}

/// Retry policy and per-attempt deadline. Swapped as one unit on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySettings {
    pub policy: RetryPolicy,
    pub attempt_timeout: Duration,
}

impl From<&TelemetryConfig> for DeliverySettings {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            policy: RetryPolicy::from(config),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

/// Submits observations off the caller's path with bounded retries.
#[derive(Clone)]
pub struct TelemetryReporter {
    sink: Arc<dyn ObservationSink>,
    settings: Arc<ArcSwap<DeliverySettings>>,
}

impl TelemetryReporter {
    /// Create a reporter delivering to `sink`.
    pub fn new(sink: Arc<dyn ObservationSink>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            sink,
            settings: Arc::new(ArcSwap::from_pointee(DeliverySettings {
                policy,
                attempt_timeout,
            })),
        }
    }

    /// Create a reporter using the retry settings from configuration.
    pub fn from_config(sink: Arc<dyn ObservationSink>, config: &TelemetryConfig) -> Self {
        let settings = DeliverySettings::from(config);
        Self::new(sink, settings.policy, settings.attempt_timeout)
    }

    /// The settings new reports will use.
    pub fn settings(&self) -> Arc<DeliverySettings> {
        self.settings.load_full()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.settings.load().policy.clone()
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.settings.load().attempt_timeout
    }

    /// Swap in new delivery settings. Reports already in flight keep theirs.
    pub fn update_settings(&self, settings: DeliverySettings) {
        tracing::info!(
            max_retries = settings.policy.max_retries,
            base_delay = ?settings.policy.base_delay,
            max_delay = ?settings.policy.max_delay,
            attempt_timeout = ?settings.attempt_timeout,
            "Telemetry delivery settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Submit an observation without waiting for it.
    ///
    /// Must be called from within a Tokio runtime; outside one the
    /// observation is dropped and logged.
    pub fn report(&self, observation: Observation) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(n = observation.n, "No async runtime, observation dropped");
                metrics::record_report("dropped");
                return;
            }
        };

        let reporter = self.clone();
        handle.spawn(async move {
            reporter.deliver(observation).await;
        });
    }

    /// Deliver an observation, retrying transient failures.
    ///
    /// This is the body of the detached task spawned by [`report`](Self::report).
    pub async fn deliver(&self, observation: Observation) -> DeliveryOutcome {
        let settings = self.settings.load_full();
        let sink = &self.sink;
        let deadline = settings.attempt_timeout;

        let outcome = settings
            .policy
            .run(
                |attempt| async move {
                    metrics::record_report_attempt();
                    tracing::trace!(n = observation.n, attempt, "Delivering observation");
                    match with_deadline(deadline, sink.deliver(observation)).await {
                        Ok(result) => result,
                        Err(elapsed) => Err(RpcError::deadline_exceeded(elapsed.to_string())),
                    }
                },
                RpcError::is_transient,
            )
            .await;

        match outcome.result {
            Ok(()) => {
                metrics::record_report("delivered");
                tracing::debug!(n = observation.n, attempts = outcome.attempts, "Observation delivered");
                DeliveryOutcome::Delivered {
                    attempts: outcome.attempts,
                }
            }
            Err(error) => {
                metrics::record_report("dropped");
                tracing::warn!(
                    n = observation.n,
                    duration = ?observation.duration,
                    attempts = outcome.attempts,
                    error = %error,
                    "Failed to record stats, observation dropped"
                );
                DeliveryOutcome::Dropped {
                    attempts: outcome.attempts,
                    error,
                }
            }
        }
    }
}

impl std::fmt::Debug for TelemetryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryReporter")
            .field("settings", &self.settings.load())
            .finish()
    }
}
