//! Observation produced by each successful computation.

use std::time::Duration;

/// A single `(n, duration)` measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The computed index.
    pub n: u32,
    /// Wall-clock time the compute call took.
    pub duration: Duration,
}

impl Observation {
    pub fn new(n: u32, duration: Duration) -> Self {
        Self { n, duration }
    }
}
