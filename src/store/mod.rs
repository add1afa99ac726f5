//! System properties storage.
//!
//! # Data Flow
//! ```text
//! App (diagnostic id, install date)
//!     → SystemStore::get / save
//!     → memory.rs (DashMap) or file.rs (JSON file)
//! ```
//!
//! # Design Decisions
//! - Key/value only; the store knows nothing about what the keys mean
//! - A missing key is `Ok(None)`, not an error
//! - Errors are returned to the direct caller untouched

pub mod diagnostic;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use diagnostic::DiagnosticId;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Key of the diagnostic identifier row.
pub const DIAGNOSTIC_ID_KEY: &str = "DiagnosticId";

/// Key of the installation date row (milliseconds since epoch).
pub const INSTALLATION_DATE_KEY: &str = "InstallationDate";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key/value store for system properties.
#[async_trait]
pub trait SystemStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn save(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn get_all(&self) -> StoreResult<HashMap<String, String>>;
}
