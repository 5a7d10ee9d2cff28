//! Statistics subsystem.
//!
//! # Data Flow
//! ```text
//! RecordObservation RPC (or in-process sink)
//!     → aggregator.rs record() under the write lock
//!
//! GetStatsSnapshot RPC
//!     → aggregator.rs snapshot() under the read lock
//!     → snapshot.rs (immutable, sorted copy handed to the caller)
//! ```

pub mod aggregator;
pub mod snapshot;

pub use aggregator::Aggregator;
pub use snapshot::{IndexStats, StatsSnapshot};
