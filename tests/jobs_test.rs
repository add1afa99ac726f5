//! Job server bootstrap from optional factories.

mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use capability_lifecycle::config::AppConfig;
use capability_lifecycle::jobs::{
    JobError, JobFactories, JobFactory, JobProducer, JobServer, JobType, Scheduler, Worker,
};
use capability_lifecycle::App;
use common::wait_until;

#[derive(Default)]
struct Counters {
    worker_runs: AtomicUsize,
    worker_exits: AtomicUsize,
    schedules: AtomicUsize,
}

struct TestWorker {
    job_type: JobType,
    counters: Arc<Counters>,
}

#[async_trait]
impl Worker for TestWorker {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        self.counters.worker_runs.fetch_add(1, Ordering::SeqCst);
        let _ = shutdown.recv().await;
        self.counters.worker_exits.fetch_add(1, Ordering::SeqCst);
    }
}

struct TestScheduler {
    job_type: JobType,
    counters: Arc<Counters>,
}

#[async_trait]
impl Scheduler for TestScheduler {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    fn enabled(&self, config: &AppConfig) -> bool {
        config.jobs.run_scheduler
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(10)
    }

    async fn schedule(&self) -> Result<(), JobError> {
        self.counters.schedules.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct TestProducer {
    job_type: JobType,
    with_worker: bool,
    with_scheduler: bool,
    counters: Arc<Counters>,
}

impl JobProducer for TestProducer {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    fn make_worker(&self) -> Option<Arc<dyn Worker>> {
        self.with_worker.then(|| {
            Arc::new(TestWorker {
                job_type: self.job_type,
                counters: self.counters.clone(),
            }) as Arc<dyn Worker>
        })
    }

    fn make_scheduler(&self) -> Option<Arc<dyn Scheduler>> {
        self.with_scheduler.then(|| {
            Arc::new(TestScheduler {
                job_type: self.job_type,
                counters: self.counters.clone(),
            }) as Arc<dyn Scheduler>
        })
    }
}

fn factory(job_type: JobType, with_scheduler: bool, counters: &Arc<Counters>) -> Option<JobFactory> {
    let counters = counters.clone();
    let factory: JobFactory = Arc::new(move |_app: &Arc<App>| {
        Arc::new(TestProducer {
            job_type,
            with_worker: true,
            with_scheduler,
            counters: counters.clone(),
        }) as Arc<dyn JobProducer>
    });
    Some(factory)
}

fn all_factories(counters: &Arc<Counters>) -> JobFactories {
    JobFactories {
        data_retention: factory(JobType::DataRetention, true, counters),
        message_export: factory(JobType::MessageExport, true, counters),
        elasticsearch_aggregator: factory(JobType::ElasticsearchAggregation, true, counters),
        elasticsearch_indexer: factory(JobType::ElasticsearchIndexing, false, counters),
        ldap_sync: factory(JobType::LdapSync, true, counters),
        migrations: factory(JobType::Migrations, false, counters),
    }
}

#[tokio::test]
async fn test_no_factories_means_no_jobs() {
    let app = App::builder().build().unwrap();
    let server = JobServer::init(&app, &JobFactories::default());

    assert!(server.job_types().is_empty());
    assert!(server.workers.is_empty());
    assert!(server.schedulers.is_empty());
    assert!(server.data_retention_job.is_none());
    assert!(server.migrations.is_none());

    server.start_workers(app.tasks());
    server.start_schedulers(app.tasks());
    assert!(app.tasks().is_empty());
}

#[tokio::test]
async fn test_all_factories_attach_and_derive() {
    let counters = Arc::new(Counters::default());
    let app = App::builder().build().unwrap();
    let server = JobServer::init(&app, &all_factories(&counters));

    assert_eq!(
        server.job_types(),
        vec![
            JobType::DataRetention,
            JobType::MessageExport,
            JobType::ElasticsearchAggregation,
            JobType::ElasticsearchIndexing,
            JobType::LdapSync,
            JobType::Migrations,
        ]
    );
    assert_eq!(server.workers.len(), 6);
    assert_eq!(server.schedulers.len(), 4);
}

#[tokio::test]
async fn test_partial_factories() {
    let counters = Arc::new(Counters::default());
    let app = App::builder().build().unwrap();
    let factories = JobFactories {
        ldap_sync: factory(JobType::LdapSync, true, &counters),
        ..JobFactories::default()
    };

    let server = JobServer::init(&app, &factories);
    assert_eq!(server.job_types(), vec![JobType::LdapSync]);
    assert!(server.ldap_sync.is_some());
    assert!(server.message_export_job.is_none());
}

#[tokio::test]
async fn test_workers_and_schedulers_run_until_shutdown() {
    let counters = Arc::new(Counters::default());
    let app = App::builder().build().unwrap();
    let server = JobServer::init(&app, &all_factories(&counters));

    server.start_workers(app.tasks());
    server.start_schedulers(app.tasks());

    assert!(wait_until(|| counters.worker_runs.load(Ordering::SeqCst) == 6).await);
    assert!(wait_until(|| counters.schedules.load(Ordering::SeqCst) >= 4).await);

    app.shutdown().await;
    assert_eq!(counters.worker_exits.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_run_flags_gate_startup() {
    let counters = Arc::new(Counters::default());
    let mut config = AppConfig::default();
    config.jobs.run_jobs = false;
    config.jobs.run_scheduler = false;
    let app = App::builder().config(config).build().unwrap();
    let server = JobServer::init(&app, &all_factories(&counters));

    server.start_workers(app.tasks());
    server.start_schedulers(app.tasks());
    assert!(app.tasks().is_empty());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(counters.worker_runs.load(Ordering::SeqCst), 0);
    assert_eq!(counters.schedules.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disabled_scheduler_skips_ticks() {
    let counters = Arc::new(Counters::default());
    let app = App::builder().build().unwrap();
    let server = JobServer::init(&app, &all_factories(&counters));
    server.start_schedulers(app.tasks());

    let mut config = AppConfig::default();
    config.jobs.run_scheduler = false;
    app.update_config(config).unwrap();

    // Allow any tick already in flight to finish.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let settled = counters.schedules.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counters.schedules.load(Ordering::SeqCst), settled);

    app.shutdown().await;
}
