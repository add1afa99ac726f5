//! Search engine capability.
//!
//! # Responsibilities
//! - Connect to the configured search engine when indexing is enabled and licensed
//! - Track whether the connection is considered live
//!
//! # Design Decisions
//! - Reads the live settings at start time; deciding *whether* to start is
//!   the controller's job, deciding *how* is ours
//! - Start while running and stop while stopped are no-ops
//! - Connectivity is a single authenticated GET against the base URL

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::capability::{Capability, CapabilityError, CapabilityKind, CapabilityResult};
use crate::config::{ConfigStore, SearchSettings};
use crate::license::LicenseState;

/// License feature that unlocks search indexing.
pub const SEARCH_FEATURE: &str = "elasticsearch";

/// Search engine client lifecycle.
pub struct ElasticsearchEngine {
    config: Arc<ConfigStore>,
    license: Arc<LicenseState>,
    client: reqwest::Client,
    running: AtomicBool,
    op_lock: Mutex<()>,
}

impl ElasticsearchEngine {
    pub fn new(config: Arc<ConfigStore>, license: Arc<LicenseState>) -> Self {
        Self {
            config,
            license,
            client: reqwest::Client::new(),
            running: AtomicBool::new(false),
            op_lock: Mutex::new(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn probe(&self, settings: &SearchSettings) -> CapabilityResult<()> {
        let timeout_secs = settings.request_timeout_secs;
        let response = self
            .client
            .get(&settings.connection_url)
            .basic_auth(&settings.username, Some(&settings.password))
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout(timeout_secs)
                } else {
                    CapabilityError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Rejected { status: status.as_u16() });
        }
        Ok(())
    }
}

#[async_trait]
impl Capability for ElasticsearchEngine {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Elasticsearch
    }

    async fn start(&self) -> CapabilityResult<()> {
        let _guard = self.op_lock.lock().await;

        let config = self.config.current();
        let settings = &config.search;
        if !settings.enable_indexing {
            tracing::debug!("Search indexing disabled, not starting");
            return Ok(());
        }

        let licensed = self
            .license
            .get()
            .map(|license| license.has_feature(SEARCH_FEATURE))
            .unwrap_or(false);
        if !licensed {
            tracing::debug!("Search indexing not licensed, not starting");
            return Ok(());
        }

        if self.is_running() {
            return Ok(());
        }

        self.probe(settings).await?;
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            url = %settings.connection_url,
            sniff = settings.sniff,
            "Search engine connected"
        );
        Ok(())
    }

    async fn stop(&self) -> CapabilityResult<()> {
        let _guard = self.op_lock.lock().await;

        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Search engine disconnected");
        }
        Ok(())
    }
}
