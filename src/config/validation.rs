//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (caps, timeouts, backoff shape)
//! - Check cross-section consistency (in-process telemetry needs stats)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::compute::MAX_FIB_INDEX;
use crate::config::schema::{AppConfig, TelemetryTransport};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.compute.enabled && !config.stats.enabled {
        errors.push(ValidationError::new(
            "compute.enabled",
            "at least one of compute or stats must be enabled",
        ));
    }

    if config.compute.max_n > MAX_FIB_INDEX {
        errors.push(ValidationError::new(
            "compute.max_n",
            format!(
                "{} exceeds {} (Fib would overflow a signed 64-bit integer)",
                config.compute.max_n, MAX_FIB_INDEX
            ),
        ));
    }

    if config.compute.enabled {
        check_socket_addr(&mut errors, "compute.bind_address", &config.compute.bind_address);
    }
    if config.stats.enabled {
        check_socket_addr(&mut errors, "stats.bind_address", &config.stats.bind_address);
    }

    let t = &config.telemetry;
    if config.compute.enabled && t.enabled {
        match t.transport {
            TelemetryTransport::Http => match Url::parse(&t.stats_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ValidationError::new(
                    "telemetry.stats_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                )),
                Err(e) => errors.push(ValidationError::new("telemetry.stats_url", e.to_string())),
            },
            TelemetryTransport::InProcess => {
                if !config.stats.enabled {
                    errors.push(ValidationError::new(
                        "telemetry.transport",
                        "in_process requires the stats service enabled in this process",
                    ));
                }
            }
        }
    }

    if t.attempt_timeout_ms == 0 {
        errors.push(ValidationError::new("telemetry.attempt_timeout_ms", "must be > 0"));
    }
    if t.multiplier == 0 {
        errors.push(ValidationError::new("telemetry.multiplier", "must be >= 1"));
    }
    if t.max_delay_ms < t.base_delay_ms {
        errors.push(ValidationError::new(
            "telemetry.max_delay_ms",
            format!("{} is below base_delay_ms {}", t.max_delay_ms, t.base_delay_ms),
        ));
    }
    if !(0.0..=1.0).contains(&t.jitter_ratio) {
        errors.push(ValidationError::new("telemetry.jitter_ratio", "must be within 0.0..=1.0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be > 0"));
    }

    let o = &config.observability;
    if o.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", o.log_level),
        ));
    }
    if o.metrics_enabled {
        check_socket_addr(&mut errors, "observability.metrics_address", &o.metrics_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("'{}': {}", value, e)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.compute.max_n = 93;
        config.compute.bind_address = "nowhere".into();
        config.telemetry.stats_url = "ftp://stats".into();
        config.telemetry.attempt_timeout_ms = 0;
        config.telemetry.max_delay_ms = 10;
        config.telemetry.jitter_ratio = 1.5;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "compute.max_n",
                "compute.bind_address",
                "telemetry.stats_url",
                "telemetry.attempt_timeout_ms",
                "telemetry.max_delay_ms",
                "telemetry.jitter_ratio",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_in_process_needs_stats() {
        let mut config = AppConfig::default();
        config.telemetry.transport = TelemetryTransport::InProcess;
        assert!(validate_config(&config).is_ok());

        config.stats.enabled = false;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "telemetry.transport");
    }

    #[test]
    fn test_nothing_enabled() {
        let mut config = AppConfig::default();
        config.compute.enabled = false;
        config.stats.enabled = false;
        assert!(validate_config(&config).is_err());
    }
}
