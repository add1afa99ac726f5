//! Config-reactive capability lifecycle library.

pub mod app;
pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod jobs;
pub mod license;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod store;

pub use app::App;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use server::Server;
