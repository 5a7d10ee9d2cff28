//! fibstats
//!
//! Fibonacci compute service and latency statistics service.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 COMPUTE SERVICE               │
//!   ComputeFib(n)          │  ┌──────────┐    ┌───────────┐   ┌─────────┐ │
//!   ───────────────────────┼─▶│ rpc      │───▶│ evaluator │──▶│  cache  │ │
//!   ◀──────────────────────┼──│ server   │◀───│           │◀──│ (store) │ │
//!   value                  │  └──────────┘    └─────┬─────┘   └─────────┘ │
//!                          │                        │ (n, duration)       │
//!                          │                        ▼ spawned, never waits │
//!                          │                  ┌───────────┐               │
//!                          │                  │ telemetry │ retry/backoff │
//!                          │                  │ reporter  │ per-attempt   │
//!                          │                  └─────┬─────┘ deadline      │
//!                          └────────────────────────┼──────────────────────┘
//!                                                   │ RecordObservation
//!                          ┌────────────────────────▼──────────────────────┐
//!   GetStatsSnapshot       │  ┌──────────┐    ┌────────────┐               │
//!   ───────────────────────┼─▶│ rpc      │───▶│ aggregator │  STATS SERVICE│
//!   ◀──────────────────────┼──│ server   │◀───│ (RwLock)   │               │
//!                          │  └──────────┘    └────────────┘               │
//!                          └───────────────────────────────────────────────┘
//!
//!   Cross-cutting: config (TOML + hot reload), observability (tracing,
//!   Prometheus), lifecycle (startup, signals, graceful shutdown)
//! ```

use clap::Parser;
use std::path::PathBuf;

use fibstats::config::{load_config, AppConfig, ConfigWatcher};
use fibstats::lifecycle::{wait_for_signal, Node, Shutdown};
use fibstats::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "fibstats", version)]
#[command(about = "Fibonacci compute and latency statistics services", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fibstats starting");

    tracing::info!(
        compute_enabled = config.compute.enabled,
        compute_address = %config.compute.bind_address,
        max_n = config.compute.max_n,
        stats_enabled = config.stats.enabled,
        stats_address = %config.stats.bind_address,
        telemetry_enabled = config.telemetry.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let node = Node::start(&config, &shutdown).await?;

    if let Some(addr) = node.compute_addr() {
        tracing::info!(address = %addr, "Compute service listening");
    }
    if let Some(addr) = node.stats_addr() {
        tracing::info!(address = %addr, "Stats service listening");
    }

    // The watcher handle must outlive the reload loop.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let mut current = config.clone();
            let mut shutdown_rx = shutdown.subscribe();
            let reload_node = node.reloader();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(next) = updates.recv() => {
                            reload_node.apply_config(&current, &next);
                            tracing::info!("Configuration reloaded");
                            current = next;
                        }
                        _ = shutdown_rx.recv() => break,
                    }
                }
            });
            Some(handle)
        }
        None => None,
    };

    wait_for_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();
    node.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
