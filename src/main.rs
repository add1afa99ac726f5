//! Capability lifecycle host.
//!
//! Keeps optional service capabilities started, stopped or restarted as the
//! configuration file and license change at runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ watcher ──▶ Server::apply_reload
//!                                   │
//!                                   ▼
//!                        App::update_config / set_license
//!                                   │  (caller's thread, registration order)
//!                                   ▼
//!                              EventBus listeners
//!                                   │  dispatch, never block
//!                                   ▼
//!                   CapabilityController queue (per capability)
//!                                   │  TaskPool worker, one action at a time
//!                                   ▼
//!                        Capability::start / Capability::stop
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::sync::mpsc;

use capability_lifecycle::config::{load_config, watcher::ConfigWatcher, AppConfig};
use capability_lifecycle::jobs::JobFactories;
use capability_lifecycle::lifecycle::Shutdown;
use capability_lifecycle::observability::{logging, metrics};
use capability_lifecycle::server::Server;

#[derive(Parser)]
#[command(name = "capability-lifecycle")]
#[command(about = "Config-reactive capability lifecycle host", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "capability-lifecycle starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        search_indexing = config.search.enable_indexing,
        run_jobs = config.jobs.run_jobs,
        run_scheduler = config.jobs.run_scheduler,
        "Configuration loaded"
    );

    // Hot reload only when running from a file.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = Server::new(config, JobFactories::default()).await?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.trigger(),
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });

    server.run(config_updates, signal).await?;
    Ok(())
}
