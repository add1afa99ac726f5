//! Supervised background task pool.
//!
//! # Responsibilities
//! - Run fire-and-forget work off the caller's thread
//! - Log tasks that panic instead of losing them silently
//! - Drain outstanding work at teardown, abort what outlives the grace period

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::lifecycle::shutdown::Shutdown;

/// Pool of supervised background tasks.
///
/// `spawn` may be called from any thread, including threads outside the
/// runtime; tasks are placed on the runtime captured at construction.
pub struct TaskPool {
    handle: Handle,
    tasks: Mutex<Option<JoinSet<()>>>,
    shutdown: Shutdown,
}

impl TaskPool {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Mutex::new(Some(JoinSet::new())),
            shutdown: Shutdown::new(),
        }
    }

    /// Submit a task. Returns false if the pool is already shut down.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tasks) = guard.as_mut() else {
            tracing::warn!(task = name, "Task pool is shut down, dropping task");
            return false;
        };

        // Reap finished tasks so the set does not grow without bound.
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }

        tasks.spawn_on(task.instrument(tracing::debug_span!("task", task = name)), &self.handle);
        true
    }

    /// Receiver that fires once shutdown begins.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Number of tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(JoinSet::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting work, signal shutdown and wait up to `grace` for
    /// outstanding tasks before aborting them.
    pub async fn shutdown(&self, grace: Duration) {
        let taken = self.tasks.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut tasks) = taken else {
            return;
        };

        self.shutdown.trigger();
        tracing::info!(tasks = tasks.len(), grace = ?grace, "Draining background tasks");

        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(remaining = tasks.len(), "Grace period elapsed, aborting background tasks");
            tasks.shutdown().await;
        }

        tracing::info!("Task pool stopped");
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Background task panicked");
        } else {
            tracing::debug!(error = %e, "Background task cancelled");
        }
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("tasks", &self.len())
            .field("shutdown", &self.shutdown)
            .finish()
    }
}
