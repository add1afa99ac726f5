//! Job producer, worker and scheduler contracts.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::AppConfig;

/// Kinds of background job the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobType {
    DataRetention,
    MessageExport,
    ElasticsearchAggregation,
    ElasticsearchIndexing,
    LdapSync,
    Migrations,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DataRetention => "data_retention",
            JobType::MessageExport => "message_export",
            JobType::ElasticsearchAggregation => "elasticsearch_post_aggregation",
            JobType::ElasticsearchIndexing => "elasticsearch_post_indexing",
            JobType::LdapSync => "ldap_sync",
            JobType::Migrations => "migrations",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to schedule {job_type} job: {message}")]
    Schedule { job_type: JobType, message: String },

    #[error("{0}")]
    Other(String),
}

/// Long-running consumer of one job type.
#[async_trait]
pub trait Worker: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Process jobs until `shutdown` fires.
    async fn run(&self, shutdown: broadcast::Receiver<()>);
}

/// Periodic creator of jobs of one type.
#[async_trait]
pub trait Scheduler: Send + Sync {
    fn job_type(&self) -> JobType;

    /// Whether jobs should be created under `config`.
    fn enabled(&self, config: &AppConfig) -> bool;

    /// Time between scheduling attempts.
    fn interval(&self) -> Duration;

    async fn schedule(&self) -> Result<(), JobError>;
}

/// Capability that supplies the worker and/or scheduler for one job type.
pub trait JobProducer: Send + Sync {
    fn job_type(&self) -> JobType;

    fn make_worker(&self) -> Option<Arc<dyn Worker>>;

    fn make_scheduler(&self) -> Option<Arc<dyn Scheduler>>;
}
