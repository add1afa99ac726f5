//! Process assembly and run loop.
//!
//! # Responsibilities
//! - Open the system properties store and load the license
//! - Assemble the App with its capability slots
//! - Record install date and diagnostic id
//! - Bootstrap the job server
//! - Apply reloaded configuration until shutdown, then tear down

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};

use crate::app::App;
use crate::capability::{CapabilitySlots, ElasticsearchEngine};
use crate::config::{AppConfig, ConfigStore};
use crate::error::AppError;
use crate::jobs::{JobFactories, JobServer};
use crate::license::{load_license, License, LicenseState};
use crate::store::{FileStore, MemoryStore, StoreError, SystemStore};

/// How often an installed license is checked for expiry.
const LICENSE_EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// The assembled process: application context plus job server.
pub struct Server {
    app: Arc<App>,
    jobs: JobServer,
}

impl Server {
    /// Assemble everything from `config` and the registered job factories.
    pub async fn new(config: AppConfig, factories: JobFactories) -> Result<Self, ServerError> {
        let store: Arc<dyn SystemStore> = match &config.store.path {
            Some(path) => Arc::new(FileStore::open(path).await?),
            None => {
                tracing::warn!("No store path configured, system properties will not persist");
                Arc::new(MemoryStore::new())
            }
        };

        let license = Arc::new(LicenseState::new(read_license(config.license.path.as_deref())));
        let config = Arc::new(ConfigStore::new(config));
        let search = Arc::new(ElasticsearchEngine::new(config.clone(), license.clone()));

        let app = App::builder()
            .config_store(config)
            .license_state(license)
            .slots(CapabilitySlots::new().with(search))
            .store(store)
            .build()?;

        app.ensure_install_date().await?;
        app.ensure_diagnostic_id().await;

        let jobs = JobServer::init(&app, &factories);

        Ok(Self { app, jobs })
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn jobs(&self) -> &JobServer {
        &self.jobs
    }

    /// Start managed capabilities, job workers and schedulers.
    pub fn start(&self) {
        self.app.start_search_lifecycle();
        self.jobs.start_workers(self.app.tasks());
        self.jobs.start_schedulers(self.app.tasks());
        tracing::info!(capabilities = ?self.app.slots().present(), "Server started");
    }

    /// Run until `shutdown` fires, applying each configuration received on
    /// `config_updates`.
    pub async fn run(
        self,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        self.start();

        let mut expiry_check = time::interval_at(
            Instant::now() + LICENSE_EXPIRY_CHECK_INTERVAL,
            LICENSE_EXPIRY_CHECK_INTERVAL,
        );

        let mut updates_open = true;
        loop {
            tokio::select! {
                update = config_updates.recv(), if updates_open => match update {
                    Some(config) => self.apply_reload(config),
                    None => updates_open = false,
                },
                _ = expiry_check.tick() => self.check_license_expiry(),
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Apply a reloaded configuration, then pick up license file changes.
    pub fn apply_reload(&self, config: AppConfig) {
        let license_path = config.license.path.clone();

        if let Err(e) = self.app.update_config(config) {
            tracing::error!(error = %e, "Config listener failed");
        }

        let license = read_license(license_path.as_deref());
        let current = self.app.license_state().installed();
        if license.as_ref() != current.as_deref() {
            if let Err(e) = self.app.set_license(license) {
                tracing::error!(error = %e, "License listener failed");
            }
        }
    }

    /// Remove an installed license that has expired so license listeners
    /// stop what it unlocked.
    pub fn check_license_expiry(&self) {
        let Some(installed) = self.app.license_state().installed() else {
            return;
        };
        if !installed.is_expired() {
            return;
        }

        tracing::warn!(license_id = %installed.id, expires_at = installed.expires_at, "License expired");
        if let Err(e) = self.app.set_license(None) {
            tracing::error!(error = %e, "License listener failed");
        }
    }

    pub async fn shutdown(self) {
        tracing::info!("Shutting down");
        self.app.shutdown().await;
        tracing::info!("Shutdown complete");
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("app", &self.app)
            .field("jobs", &self.jobs)
            .finish()
    }
}

fn read_license(path: Option<&str>) -> Option<License> {
    let path = path?;
    match load_license(Path::new(path)) {
        Ok(license) => license,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to load license, running unlicensed");
            None
        }
    }
}
