//! Background job subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     JobFactories (each optional)
//!     → server.rs JobServer::init (invoke present factories with the App)
//!     → producers → make_worker / make_scheduler
//!     → workers + schedulers
//!
//! Running:
//!     workers   → TaskPool (until shutdown)
//!     schedulers → interval loop → Scheduler::schedule
//! ```
//!
//! # Design Decisions
//! - A missing factory is not an error; the job type is just unavailable
//! - Worker and scheduler sets are derived once, after all producers attach
//! - `jobs.run_jobs` / `jobs.run_scheduler` decide what runs in this process

pub mod server;
pub mod types;

pub use server::{JobFactories, JobFactory, JobServer};
pub use types::{JobError, JobProducer, JobType, Scheduler, Worker};
