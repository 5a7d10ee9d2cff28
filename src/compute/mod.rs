//! Compute subsystem.
//!
//! # Data Flow
//! ```text
//! ComputeFib(n)
//!     → evaluator.rs (validate, cache lookup)
//!     → store.rs (hit: return cached value)
//!     → sequence.rs (miss: iterate from nearest cached pair)
//!     → store.rs (write intermediates + result)
//!     → telemetry reporter (detached, observation of elapsed time)
//! ```

pub mod evaluator;
pub mod sequence;
pub mod store;

pub use evaluator::{CacheStats, ComputeError, Evaluator};
pub use sequence::MAX_FIB_INDEX;
pub use store::{CacheStore, MemoryStore, StoreError};
