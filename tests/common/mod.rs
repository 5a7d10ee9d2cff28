//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::{http::StatusCode, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use fibstats::config::{AppConfig, TelemetryTransport};
use fibstats::lifecycle::{Node, Shutdown};

/// Config with both services on ephemeral loopback ports.
pub fn local_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.compute.bind_address = "127.0.0.1:0".into();
    config.stats.bind_address = "127.0.0.1:0".into();
    config.telemetry.transport = TelemetryTransport::InProcess;
    config
}

/// A node running only the stats service.
pub async fn start_stats_node(shutdown: &Shutdown) -> (Node, String) {
    let mut config = local_config();
    config.compute.enabled = false;
    config.telemetry.enabled = false;

    let node = Node::start(&config, shutdown).await.unwrap();
    let url = format!("http://{}", node.stats_addr().unwrap());
    (node, url)
}

/// A node running only the compute service, reporting to `stats_url` with
/// short retry delays.
pub async fn start_compute_node(stats_url: &str, shutdown: &Shutdown) -> (Node, String) {
    let mut config = local_config();
    config.stats.enabled = false;
    config.telemetry.transport = TelemetryTransport::Http;
    config.telemetry.stats_url = stats_url.to_string();
    config.telemetry.fail_fast = false;
    config.telemetry.base_delay_ms = 10;
    config.telemetry.max_delay_ms = 40;
    config.telemetry.attempt_timeout_ms = 500;

    let node = Node::start(&config, shutdown).await.unwrap();
    let url = format!("http://{}", node.compute_addr().unwrap());
    (node, url)
}

/// Start a programmable backend that answers every request with whatever
/// `f` returns. Returns its base URL.
pub async fn start_programmable_backend<F, Fut>(f: F) -> String
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
            let headers = [(axum::http::header::CONTENT_TYPE, "application/json")];
            (status, headers, body)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
