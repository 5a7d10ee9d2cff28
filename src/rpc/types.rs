//! Wire types for the compute and stats services.

use serde::{Deserialize, Serialize};

use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeFibRequest {
    pub n: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeFibResponse {
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordObservationRequest {
    pub n: i32,
    pub duration_nanos: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordObservationResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GetStatsSnapshotRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibStat {
    pub n: u32,
    pub count: u64,
    pub average_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetStatsSnapshotResponse {
    pub total_requests: u64,
    pub per_n: Vec<FibStat>,
}

impl From<&StatsSnapshot> for GetStatsSnapshotResponse {
    fn from(snapshot: &StatsSnapshot) -> Self {
        Self {
            total_requests: snapshot.total_requests,
            per_n: snapshot
                .per_n
                .iter()
                .map(|s| FibStat {
                    n: s.n,
                    count: s.count,
                    average_ms: s.average_ms(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
