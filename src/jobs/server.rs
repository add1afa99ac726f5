//! Job server assembly and startup.
//!
//! # Responsibilities
//! - Attach the job producers whose factories were registered
//! - Derive the worker and scheduler sets from the attached producers
//! - Run workers and scheduler loops on the task pool

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::app::App;
use crate::config::ConfigStore;
use crate::jobs::types::{JobProducer, JobType, Scheduler, Worker};
use crate::lifecycle::TaskPool;

/// `tokio::time::interval` panics on a zero period.
const MIN_SCHEDULER_INTERVAL: Duration = Duration::from_millis(1);

/// Builds a job producer from the application handle.
pub type JobFactory = Arc<dyn Fn(&Arc<App>) -> Arc<dyn JobProducer> + Send + Sync>;

/// Factories registered at build/plugin-registration time.
///
/// Each entry is optional; an absent factory simply means the job type is
/// not available in this process.
#[derive(Clone, Default)]
pub struct JobFactories {
    pub data_retention: Option<JobFactory>,
    pub message_export: Option<JobFactory>,
    pub elasticsearch_aggregator: Option<JobFactory>,
    pub elasticsearch_indexer: Option<JobFactory>,
    pub ldap_sync: Option<JobFactory>,
    pub migrations: Option<JobFactory>,
}

impl fmt::Debug for JobFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobFactories")
            .field("data_retention", &self.data_retention.is_some())
            .field("message_export", &self.message_export.is_some())
            .field("elasticsearch_aggregator", &self.elasticsearch_aggregator.is_some())
            .field("elasticsearch_indexer", &self.elasticsearch_indexer.is_some())
            .field("ldap_sync", &self.ldap_sync.is_some())
            .field("migrations", &self.migrations.is_some())
            .finish()
    }
}

/// Job producers plus the workers and schedulers derived from them.
pub struct JobServer {
    config: Arc<ConfigStore>,

    pub data_retention_job: Option<Arc<dyn JobProducer>>,
    pub message_export_job: Option<Arc<dyn JobProducer>>,
    pub elasticsearch_aggregator: Option<Arc<dyn JobProducer>>,
    pub elasticsearch_indexer: Option<Arc<dyn JobProducer>>,
    pub ldap_sync: Option<Arc<dyn JobProducer>>,
    pub migrations: Option<Arc<dyn JobProducer>>,

    pub workers: Vec<Arc<dyn Worker>>,
    pub schedulers: Vec<Arc<dyn Scheduler>>,
}

impl JobServer {
    /// An empty job server reading settings from `config`.
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            data_retention_job: None,
            message_export_job: None,
            elasticsearch_aggregator: None,
            elasticsearch_indexer: None,
            ldap_sync: None,
            migrations: None,
            workers: Vec::new(),
            schedulers: Vec::new(),
        }
    }

    /// Attach every registered producer, then derive workers and schedulers.
    pub fn init(app: &Arc<App>, factories: &JobFactories) -> Self {
        let build = |factory: &Option<JobFactory>| factory.as_ref().map(|f| f(app));

        let mut server = Self::new(app.config_store().clone());
        server.data_retention_job = build(&factories.data_retention);
        server.message_export_job = build(&factories.message_export);
        server.elasticsearch_aggregator = build(&factories.elasticsearch_aggregator);
        server.elasticsearch_indexer = build(&factories.elasticsearch_indexer);
        server.ldap_sync = build(&factories.ldap_sync);
        server.migrations = build(&factories.migrations);

        server.workers = server.init_workers();
        server.schedulers = server.init_schedulers();

        tracing::info!(
            producers = server.producers().count(),
            workers = server.workers.len(),
            schedulers = server.schedulers.len(),
            "Job server initialized"
        );
        server
    }

    /// Attached producers in a fixed order.
    pub fn producers(&self) -> impl Iterator<Item = &Arc<dyn JobProducer>> {
        [
            &self.data_retention_job,
            &self.message_export_job,
            &self.elasticsearch_aggregator,
            &self.elasticsearch_indexer,
            &self.ldap_sync,
            &self.migrations,
        ]
        .into_iter()
        .flatten()
    }

    pub fn init_workers(&self) -> Vec<Arc<dyn Worker>> {
        self.producers().filter_map(|p| p.make_worker()).collect()
    }

    pub fn init_schedulers(&self) -> Vec<Arc<dyn Scheduler>> {
        self.producers().filter_map(|p| p.make_scheduler()).collect()
    }

    pub fn job_types(&self) -> Vec<JobType> {
        self.producers().map(|p| p.job_type()).collect()
    }

    /// Run every worker on `pool` if this process runs jobs.
    pub fn start_workers(&self, pool: &TaskPool) {
        if !self.config.current().jobs.run_jobs {
            tracing::info!("Job workers disabled");
            return;
        }

        for worker in &self.workers {
            let worker = worker.clone();
            let shutdown = pool.subscribe_shutdown();
            tracing::debug!(job_type = %worker.job_type(), "Starting job worker");
            pool.spawn("job-worker", async move {
                worker.run(shutdown).await;
            });
        }
    }

    /// Run every scheduler loop on `pool` if this process runs schedulers.
    pub fn start_schedulers(&self, pool: &TaskPool) {
        if !self.config.current().jobs.run_scheduler {
            tracing::info!("Job schedulers disabled");
            return;
        }

        for scheduler in &self.schedulers {
            let shutdown = pool.subscribe_shutdown();
            pool.spawn(
                "job-scheduler",
                run_scheduler(scheduler.clone(), self.config.clone(), shutdown),
            );
        }
    }
}

impl fmt::Debug for JobServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobServer")
            .field("job_types", &self.job_types())
            .field("workers", &self.workers.len())
            .field("schedulers", &self.schedulers.len())
            .finish()
    }
}

async fn run_scheduler(
    scheduler: Arc<dyn Scheduler>,
    config: Arc<ConfigStore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let job_type = scheduler.job_type();
    let interval = scheduler.interval().max(MIN_SCHEDULER_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + interval, interval);

    tracing::debug!(job_type = %job_type, interval = ?interval, "Job scheduler starting");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !scheduler.enabled(&config.current()) {
                    continue;
                }
                if let Err(e) = scheduler.schedule().await {
                    tracing::error!(job_type = %job_type, error = %e, "Failed to schedule job");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!(job_type = %job_type, "Job scheduler received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
