//! RPC server setup.
//!
//! # Responsibilities
//! - Create Axum routers for the compute and stats services
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Translate between wire types and the core components
//! - Serve until the shutdown signal fires

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::compute::{Evaluator, MAX_FIB_INDEX};
use crate::config::{LimitsConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::rpc::request_id::{propagate_request_id_layer, set_request_id_layer};
use crate::rpc::status::RpcError;
use crate::rpc::types::{
    ComputeFibRequest, ComputeFibResponse, GetStatsSnapshotResponse, HealthResponse,
    RecordObservationRequest, RecordObservationResponse,
};
use crate::stats::Aggregator;

pub const COMPUTE_FIB_PATH: &str = "/rpc/ComputeFib";
pub const RECORD_OBSERVATION_PATH: &str = "/rpc/RecordObservation";
pub const GET_STATS_SNAPSHOT_PATH: &str = "/rpc/GetStatsSnapshot";
pub const HEALTH_PATH: &str = "/health";

/// An RPC service bound to one listener.
pub struct RpcServer {
    name: &'static str,
    router: Router,
}

impl RpcServer {
    /// Compute service backed by `evaluator`.
    pub fn compute(evaluator: Arc<Evaluator>, timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Self {
        let routes = Router::new()
            .route(COMPUTE_FIB_PATH, post(compute_fib))
            .with_state(evaluator)
            .route(HEALTH_PATH, get(|| health("compute")));

        Self {
            name: "compute",
            router: Self::with_middleware(routes, timeouts, limits),
        }
    }

    /// Stats service backed by `aggregator`.
    pub fn stats(aggregator: Arc<Aggregator>, timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Self {
        let routes = Router::new()
            .route(RECORD_OBSERVATION_PATH, post(record_observation))
            .route(GET_STATS_SNAPSHOT_PATH, post(get_stats_snapshot).get(get_stats_snapshot))
            .with_state(aggregator)
            .route(HEALTH_PATH, get(|| health("stats")));

        Self {
            name: "stats",
            router: Self::with_middleware(routes, timeouts, limits),
        }
    }

    /// Wrap routes with the middleware stack shared by both services.
    #[allow(deprecated)]
    fn with_middleware(routes: Router, timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Router {
        routes
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Service name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The fully layered router, for embedding or in-memory testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(service = self.name, address = %addr, "RPC server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(service = self.name, "RPC server stopped");
        Ok(())
    }
}

async fn compute_fib(
    State(evaluator): State<Arc<Evaluator>>,
    payload: Result<Json<ComputeFibRequest>, JsonRejection>,
) -> Result<Json<ComputeFibResponse>, RpcError> {
    let result = payload
        .map_err(|e| RpcError::invalid_argument(e.body_text()))
        .and_then(|Json(req)| evaluator.compute(req.n).map_err(RpcError::from));

    match result {
        Ok(value) => {
            metrics::record_rpc("ComputeFib", "OK");
            Ok(Json(ComputeFibResponse { value }))
        }
        Err(e) => {
            metrics::record_rpc("ComputeFib", e.code.as_str());
            Err(e)
        }
    }
}

async fn record_observation(
    State(aggregator): State<Arc<Aggregator>>,
    payload: Result<Json<RecordObservationRequest>, JsonRejection>,
) -> Result<Json<RecordObservationResponse>, RpcError> {
    let result = payload
        .map_err(|e| RpcError::invalid_argument(e.body_text()))
        .and_then(|Json(req)| validate_observation(&req));

    match result {
        Ok((n, duration)) => {
            aggregator.record(n, duration);
            metrics::record_rpc("RecordObservation", "OK");
            Ok(Json(RecordObservationResponse { accepted: true }))
        }
        Err(e) => {
            tracing::info!(error = %e, "Rejected observation");
            metrics::record_rpc("RecordObservation", e.code.as_str());
            Err(e)
        }
    }
}

fn validate_observation(req: &RecordObservationRequest) -> Result<(u32, Duration), RpcError> {
    let n = u32::try_from(req.n)
        .map_err(|_| RpcError::invalid_argument(format!("n must be non-negative, got {}", req.n)))?;
    if n > MAX_FIB_INDEX {
        return Err(RpcError::invalid_argument(format!(
            "n must be <= {}, got {}",
            MAX_FIB_INDEX, n
        )));
    }
    let nanos = u64::try_from(req.duration_nanos).map_err(|_| {
        RpcError::invalid_argument(format!(
            "duration_nanos must be non-negative, got {}",
            req.duration_nanos
        ))
    })?;
    Ok((n, Duration::from_nanos(nanos)))
}

async fn get_stats_snapshot(State(aggregator): State<Arc<Aggregator>>) -> Json<GetStatsSnapshotResponse> {
    let snapshot = aggregator.snapshot();
    tracing::debug!(
        total_requests = snapshot.total_requests,
        tracked = snapshot.per_n.len(),
        "Returning stats snapshot"
    );
    metrics::record_rpc("GetStatsSnapshot", "OK");
    Json(GetStatsSnapshotResponse::from(&snapshot))
}

async fn health(service: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: service.to_string(),
    })
}
