//! Configuration file watcher for hot reload.
//!
//! Each file event re-reads and validates the whole file. Only a valid
//! snapshot that differs from the last one delivered is forwarded, since a
//! single save usually produces several modify events.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;
use crate::observability::metrics;

/// Result of re-reading the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new snapshot was forwarded.
    Loaded,
    /// The file parsed to the snapshot already delivered.
    Unchanged,
    /// The file could not be read or failed validation.
    Rejected,
}

/// Watches the configuration file and forwards new snapshots.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
    last: Arc<Mutex<Option<AppConfig>>>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
            last: Arc::new(Mutex::new(load_config(path).ok())),
        };
        (watcher, update_rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and forward it if it is valid and new.
    pub fn reload(&self) -> ReloadOutcome {
        reload(&self.path, &self.update_tx, &self.last)
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let tx = self.update_tx.clone();
        let last = self.last.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::debug!(path = ?path, kind = ?event.kind, "Config file event");
                    reload(&path, &tx, &last);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    tx: &mpsc::UnboundedSender<AppConfig>,
    last: &Mutex<Option<AppConfig>>,
) -> ReloadOutcome {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            metrics::record_config_reload("rejected");
            tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current configuration");
            return ReloadOutcome::Rejected;
        }
    };

    let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
    if last.as_ref() == Some(&config) {
        return ReloadOutcome::Unchanged;
    }

    tracing::info!(path = ?path, "Config file changed, applying");
    metrics::record_config_reload("loaded");
    *last = Some(config.clone());
    let _ = tx.send(config);
    ReloadOutcome::Loaded
}
