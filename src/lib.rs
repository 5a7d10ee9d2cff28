//! Fibonacci compute and latency statistics services.

pub mod compute;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod rpc;
pub mod stats;
pub mod telemetry;

pub use compute::Evaluator;
pub use config::AppConfig;
pub use lifecycle::{Node, Shutdown};
pub use rpc::{ComputeClient, RpcError, StatsClient};
pub use stats::Aggregator;
pub use telemetry::TelemetryReporter;
