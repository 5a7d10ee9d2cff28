//! RPC subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → client.rs (JSON over HTTP POST, error classification)
//!     → server.rs (Axum router, middleware, handlers)
//!     → Evaluator / Aggregator
//!     → status.rs (errors as {code, message} with a matching HTTP status)
//! ```
//!
//! # Methods
//! - `POST /rpc/ComputeFib` `{n}` → `{value}`
//! - `POST /rpc/RecordObservation` `{n, duration_nanos}` → `{accepted}`
//! - `POST|GET /rpc/GetStatsSnapshot` → `{total_requests, per_n}`
//! - `GET /health` on both services

pub mod client;
pub mod request_id;
pub mod server;
pub mod status;
pub mod types;

pub use client::{ComputeClient, StatsClient};
pub use server::RpcServer;
pub use status::{Code, RpcError};
