//! Per-capability lifecycle controller.
//!
//! # States
//! - Stopped: capability not running (initial)
//! - Starting: start in progress
//! - Running: last start succeeded
//! - Stopping: stop in progress
//!
//! # State Transitions
//! ```text
//! Stopped/Running → Starting → Running   (start ok)
//!                            → previous  (start failed)
//! Stopped/Running → Stopping → Stopped   (stop ok)
//!                            → previous  (stop failed)
//! ```
//!
//! # Design Decisions
//! - One queue and one worker task per capability: actions run strictly in
//!   dispatch order and never overlap
//! - `dispatch` never blocks, so it is safe to call from config listeners
//! - Failures are logged and counted, never retried or returned
//! - Queued actions are drained when the pool shuts down

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::capability::{Capability, CapabilityKind};
use crate::lifecycle::tasks::TaskPool;
use crate::observability::metrics;

/// Lifecycle state of a controlled capability.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Action requested of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    /// Stop then start, as one step.
    Restart,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        }
    }
}

enum Command {
    Run(LifecycleAction),
    Flush(oneshot::Sender<()>),
}

struct Inner {
    kind: CapabilityKind,
    capability: Arc<dyn Capability>,
    state: AtomicU8,
}

/// Handle to the serialized start/stop worker of one capability.
#[derive(Clone)]
pub struct CapabilityController {
    inner: Arc<Inner>,
    tx: mpsc::UnboundedSender<Command>,
}

impl CapabilityController {
    /// Create the controller and spawn its worker on `pool`.
    pub fn spawn(capability: Arc<dyn Capability>, pool: &TaskPool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            kind: capability.kind(),
            capability,
            state: AtomicU8::new(LifecycleState::Stopped as u8),
        });

        let shutdown = pool.subscribe_shutdown();
        pool.spawn("capability-controller", run(inner.clone(), rx, shutdown));

        Self { inner, tx }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.inner.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.load(Ordering::SeqCst).into()
    }

    /// Queue an action. Returns false if the worker is gone.
    pub fn dispatch(&self, action: LifecycleAction) -> bool {
        tracing::debug!(capability = %self.inner.kind, action = action.as_str(), "Dispatching lifecycle action");
        if self.tx.send(Command::Run(action)).is_err() {
            tracing::warn!(
                capability = %self.inner.kind,
                action = action.as_str(),
                "Lifecycle worker stopped, action dropped"
            );
            return false;
        }
        true
    }

    /// Wait until every action dispatched before this call has finished.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

impl std::fmt::Debug for CapabilityController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityController")
            .field("kind", &self.inner.kind)
            .field("state", &self.state())
            .finish()
    }
}

async fn run(
    inner: Arc<Inner>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            command = rx.recv() => match command {
                Some(command) => inner.handle(command).await,
                None => break,
            },
            _ = shutdown.recv() => {
                while let Ok(command) = rx.try_recv() {
                    inner.handle(command).await;
                }
                break;
            }
        }
    }
    tracing::debug!(capability = %inner.kind, "Lifecycle worker exiting");
}

impl Inner {
    async fn handle(&self, command: Command) {
        match command {
            Command::Run(LifecycleAction::Start) => self.start().await,
            Command::Run(LifecycleAction::Stop) => self.stop().await,
            Command::Run(LifecycleAction::Restart) => {
                self.stop().await;
                self.start().await;
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    async fn start(&self) {
        let previous = self.transition(LifecycleState::Starting);
        match self.capability.start().await {
            Ok(()) => {
                self.transition(LifecycleState::Running);
                metrics::record_capability_action(self.kind.as_str(), "start", true);
                tracing::debug!(capability = %self.kind, "Capability started");
            }
            Err(e) => {
                self.transition(previous);
                metrics::record_capability_action(self.kind.as_str(), "start", false);
                tracing::error!(capability = %self.kind, error = %e, "Failed to start capability");
            }
        }
    }

    async fn stop(&self) {
        let previous = self.transition(LifecycleState::Stopping);
        match self.capability.stop().await {
            Ok(()) => {
                self.transition(LifecycleState::Stopped);
                metrics::record_capability_action(self.kind.as_str(), "stop", true);
                tracing::debug!(capability = %self.kind, "Capability stopped");
            }
            Err(e) => {
                self.transition(previous);
                metrics::record_capability_action(self.kind.as_str(), "stop", false);
                tracing::error!(capability = %self.kind, error = %e, "Failed to stop capability");
            }
        }
    }

    fn transition(&self, next: LifecycleState) -> LifecycleState {
        let previous = self.state.swap(next as u8, Ordering::SeqCst).into();
        metrics::record_capability_state(self.kind.as_str(), next as u8);
        previous
    }
}
