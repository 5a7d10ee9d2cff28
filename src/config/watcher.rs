//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Keep the returned handle alive for as long
    /// as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Settings that changed between two configs but only apply after restart.
pub fn restart_required(current: &AppConfig, next: &AppConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if current.compute != next.compute {
        changed.push("compute");
    }
    if current.stats != next.stats {
        changed.push("stats");
    }
    if current.telemetry.enabled != next.telemetry.enabled
        || current.telemetry.transport != next.telemetry.transport
        || current.telemetry.stats_url != next.telemetry.stats_url
        || current.telemetry.fail_fast != next.telemetry.fail_fast
    {
        changed.push("telemetry.transport");
    }
    if current.timeouts != next.timeouts {
        changed.push("timeouts");
    }
    if current.limits != next.limits {
        changed.push("limits");
    }
    if current.observability != next.observability {
        changed.push("observability");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_changes_apply_live() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.telemetry.max_retries = 7;
        next.telemetry.base_delay_ms = 20;
        assert!(restart_required(&current, &next).is_empty());
    }

    #[test]
    fn test_attempt_timeout_applies_live() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.telemetry.attempt_timeout_ms = 50;
        assert!(restart_required(&current, &next).is_empty());
    }

    #[test]
    fn test_fail_fast_change_needs_restart() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.telemetry.fail_fast = false;
        assert_eq!(restart_required(&current, &next), vec!["telemetry.transport"]);
    }

    #[test]
    fn test_listener_changes_need_restart() {
        let current = AppConfig::default();
        let mut next = current.clone();
        next.compute.bind_address = "127.0.0.1:6001".into();
        next.telemetry.stats_url = "http://10.0.0.2:5002".into();
        assert_eq!(restart_required(&current, &next), vec!["compute", "telemetry.transport"]);
    }
}
