//! Telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! Evaluator (observation after compute)
//!     → reporter.rs report() spawns a detached task, returns at once
//!     → resilience retry policy + per-attempt deadline
//!     → ObservationSink (StatsClient over RPC, or an in-process Aggregator)
//!     → delivered, or dropped and logged
//! ```
//!
//! # Design Decisions
//! - At-most-once, best-effort delivery
//! - Nothing on this path can fail or delay the compute caller

pub mod observation;
pub mod reporter;

pub use observation::Observation;
pub use reporter::{DeliveryOutcome, DeliverySettings, ObservationSink, TelemetryReporter};
