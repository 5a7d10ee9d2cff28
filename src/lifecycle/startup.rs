//! Startup orchestration.
//!
//! # Responsibilities
//! - Build each enabled subsystem from its config section
//! - Connect telemetry to the stats service (remote or in-process)
//! - Bind listeners and spawn the RPC servers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Stats starts before compute so in-process telemetry has a target
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::compute::{Evaluator, MemoryStore};
use crate::config::watcher::restart_required;
use crate::config::{AppConfig, TelemetryConfig, TelemetryTransport};
use crate::lifecycle::Shutdown;
use crate::rpc::{RpcError, RpcServer, StatsClient};
use crate::stats::Aggregator;
use crate::telemetry::{DeliverySettings, ObservationSink, TelemetryReporter};

/// Fatal errors while bringing a node up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {service} listener on {address}: {source}")]
    Bind {
        service: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stats client configuration: {0}")]
    Client(#[source] RpcError),

    #[error("stats service unreachable at {url}: {source}")]
    StatsUnreachable {
        url: String,
        #[source]
        source: RpcError,
    },

    #[error("in-process telemetry requires the stats service in this process")]
    NoLocalStats,
}

/// A running process: whichever services the config enabled.
pub struct Node {
    evaluator: Option<Arc<Evaluator>>,
    aggregator: Option<Arc<Aggregator>>,
    reporter: Option<TelemetryReporter>,
    compute_addr: Option<SocketAddr>,
    stats_addr: Option<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Build and start every enabled service.
    pub async fn start(config: &AppConfig, shutdown: &Shutdown) -> Result<Self, StartupError> {
        let mut node = Node {
            evaluator: None,
            aggregator: None,
            reporter: None,
            compute_addr: None,
            stats_addr: None,
            tasks: Vec::new(),
        };

        if config.stats.enabled {
            let aggregator = Arc::new(Aggregator::new());
            let listener = bind("stats", &config.stats.bind_address).await?;
            node.stats_addr = listener.local_addr().ok();

            let server = RpcServer::stats(aggregator.clone(), &config.timeouts, &config.limits);
            node.tasks.push(spawn_server(server, listener, shutdown));
            node.aggregator = Some(aggregator);
        }

        if config.compute.enabled {
            let mut evaluator =
                Evaluator::new(Arc::new(MemoryStore::new())).with_max_n(config.compute.max_n);

            if config.telemetry.enabled {
                let sink = node.telemetry_sink(&config.telemetry).await?;
                let reporter = TelemetryReporter::from_config(sink, &config.telemetry);
                tracing::info!(
                    transport = ?config.telemetry.transport,
                    max_retries = config.telemetry.max_retries,
                    attempt_timeout_ms = config.telemetry.attempt_timeout_ms,
                    "Telemetry reporter ready"
                );
                evaluator = evaluator.with_reporter(reporter.clone());
                node.reporter = Some(reporter);
            } else {
                tracing::info!("Telemetry disabled");
            }

            let evaluator = Arc::new(evaluator);
            let listener = bind("compute", &config.compute.bind_address).await?;
            node.compute_addr = listener.local_addr().ok();

            let server = RpcServer::compute(evaluator.clone(), &config.timeouts, &config.limits);
            node.tasks.push(spawn_server(server, listener, shutdown));
            node.evaluator = Some(evaluator);
        }

        Ok(node)
    }

    async fn telemetry_sink(&self, config: &TelemetryConfig) -> Result<Arc<dyn ObservationSink>, StartupError> {
        match config.transport {
            TelemetryTransport::InProcess => {
                let aggregator: Arc<dyn ObservationSink> =
                    self.aggregator.clone().ok_or(StartupError::NoLocalStats)?;
                Ok(aggregator)
            }
            TelemetryTransport::Http => {
                let client = StatsClient::new(&config.stats_url).map_err(StartupError::Client)?;
                if config.fail_fast {
                    client
                        .health()
                        .await
                        .map_err(|source| StartupError::StatsUnreachable {
                            url: config.stats_url.clone(),
                            source,
                        })?;
                    tracing::info!(url = %config.stats_url, "Connected to stats service");
                }
                let sink: Arc<dyn ObservationSink> = Arc::new(client);
                Ok(sink)
            }
        }
    }

    /// Apply a reloaded configuration. Returns the sections that need a
    /// restart to take effect.
    pub fn apply_config(&self, current: &AppConfig, next: &AppConfig) -> Vec<&'static str> {
        self.reloader().apply_config(current, next)
    }

    /// Handle for applying reloads after the node itself has been moved
    /// into [`Node::wait`].
    pub fn reloader(&self) -> Reloader {
        Reloader {
            reporter: self.reporter.clone(),
        }
    }

    pub fn evaluator(&self) -> Option<&Arc<Evaluator>> {
        self.evaluator.as_ref()
    }

    pub fn aggregator(&self) -> Option<&Arc<Aggregator>> {
        self.aggregator.as_ref()
    }

    pub fn reporter(&self) -> Option<&TelemetryReporter> {
        self.reporter.as_ref()
    }

    /// Bound address of the compute service, if running.
    pub fn compute_addr(&self) -> Option<SocketAddr> {
        self.compute_addr
    }

    /// Bound address of the stats service, if running.
    pub fn stats_addr(&self) -> Option<SocketAddr> {
        self.stats_addr
    }

    /// Wait for every server task to finish.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task panicked");
            }
        }
    }
}

/// Applies hot-reloaded settings to a running node.
#[derive(Clone)]
pub struct Reloader {
    reporter: Option<TelemetryReporter>,
}

impl Reloader {
    pub fn apply_config(&self, current: &AppConfig, next: &AppConfig) -> Vec<&'static str> {
        if let Some(reporter) = &self.reporter {
            let settings = DeliverySettings::from(&next.telemetry);
            if *reporter.settings() != settings {
                reporter.update_settings(settings);
            }
        }

        let pending = restart_required(current, next);
        if !pending.is_empty() {
            tracing::warn!(sections = ?pending, "Config changes require a restart to take effect");
        }
        pending
    }
}

async fn bind(service: &'static str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            service,
            address: address.to_string(),
            source,
        })
}

fn spawn_server(server: RpcServer, listener: TcpListener, shutdown: &Shutdown) -> JoinHandle<()> {
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let name = server.name();
        if let Err(e) = server.run(listener, rx).await {
            tracing::error!(service = name, error = %e, "RPC server failed");
        }
    })
}
