//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (telemetry delivery):
//!     → timeouts.rs (per-attempt deadline)
//!     → On failure: retries.rs (classify, back off, try again)
//!     → backoff.rs (delay for the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only errors the caller marks transient are retried
//! - Retry is a generic higher-order operation, not tied to a call site

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{RetryOutcome, RetryPolicy};
pub use timeouts::{with_deadline, DeadlineExceeded};
