//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the services.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::compute::MAX_FIB_INDEX;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Compute service (Fibonacci evaluator).
    pub compute: ComputeConfig,

    /// Stats service (aggregator).
    pub stats: StatsConfig,

    /// Telemetry delivery from compute to stats.
    pub telemetry: TelemetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Compute service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ComputeConfig {
    /// Run the compute service in this process.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:5001").
    pub bind_address: String,

    /// Largest accepted index (at most 92).
    pub max_n: u32,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:5001".to_string(),
            max_n: MAX_FIB_INDEX,
        }
    }
}

/// Stats service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    /// Run the stats service in this process.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:5002").
    pub bind_address: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:5002".to_string(),
        }
    }
}

/// How observations travel from compute to stats.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryTransport {
    /// RecordObservation RPC against `stats_url`.
    #[default]
    Http,
    /// Direct calls into the aggregator of this process.
    InProcess,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Report observations at all.
    pub enabled: bool,

    /// Delivery transport.
    pub transport: TelemetryTransport,

    /// Base URL of the stats service.
    pub stats_url: String,

    /// Refuse to start when the stats service is unreachable.
    pub fail_fast: bool,

    /// Deadline for a single delivery attempt in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff growth factor.
    pub multiplier: u32,

    /// Upper bound on a single backoff delay in milliseconds.
    pub max_delay_ms: u64,

    /// Random jitter as a fraction of each delay (0.0 disables).
    pub jitter_ratio: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: TelemetryTransport::Http,
            stats_url: "http://127.0.0.1:5002".to_string(),
            fail_fast: true,
            attempt_timeout_ms: 2000,
            max_retries: 3,
            base_delay_ms: 100,
            multiplier: 2,
            max_delay_ms: 800,
            jitter_ratio: 0.0,
        }
    }
}

/// Timeout configuration for served requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
