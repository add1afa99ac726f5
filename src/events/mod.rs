//! Config/license event bus.
//!
//! # Data Flow
//! ```text
//! App::update_config(new)
//!     → ConfigStore swap returns old
//!     → EventBus::fire_config_change(old, new)
//!     → listeners in registration order (caller's thread)
//!
//! App::set_license(license)
//!     → LicenseState swap
//!     → EventBus::fire_license_change()
//! ```
//!
//! # Design Decisions
//! - The bus is an owned object on the application context, not a global
//! - Listeners must return quickly; I/O is queued to the task pool
//! - Failures are not contained: a failing listener fails the apply call

pub mod bus;

pub use bus::{ConfigListener, EventBus, LicenseListener, ListenerError};
