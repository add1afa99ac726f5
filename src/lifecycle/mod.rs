//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Config/license change (caller's thread):
//!     listener → search.rs rules → CapabilityController::dispatch
//!
//! Background (tasks.rs pool):
//!     controller.rs worker → Capability::start / stop, one at a time
//!
//! Teardown (shutdown.rs):
//!     TaskPool::shutdown → signal → drain queues → abort after grace period
//! ```
//!
//! # Design Decisions
//! - The config-apply path never waits on capability I/O
//! - Start/stop of one capability are serialized, never interleaved
//! - Shutdown has timeout: tasks still running after the grace period are aborted

pub mod controller;
pub mod search;
pub mod shutdown;
pub mod tasks;

pub use controller::{CapabilityController, LifecycleAction, LifecycleState};
pub use shutdown::Shutdown;
pub use tasks::TaskPool;
