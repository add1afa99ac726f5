//! Optional service capabilities.
//!
//! # Data Flow
//! ```text
//! Process assembly:
//!     concrete implementations (or nothing)
//!     → slots.rs (CapabilitySlots, one Option per kind)
//!     → App (read-only afterwards)
//!
//! Runtime:
//!     lifecycle controller → Capability::start / Capability::stop
//! ```
//!
//! # Design Decisions
//! - Absence is `None`, never a sentinel implementation or error value
//! - Every call site checks presence before invoking
//! - start/stop default to no-ops so stateless services need no lifecycle code
//! - Implementations must make start-when-running and stop-when-stopped no-ops

pub mod search;
pub mod slots;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use search::ElasticsearchEngine;
pub use slots::CapabilitySlots;

/// The fixed set of capability slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    AccountMigration,
    Cluster,
    Compliance,
    DataRetention,
    Elasticsearch,
    Ldap,
    MessageExport,
    Metrics,
    Mfa,
    Saml,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 10] = [
        CapabilityKind::AccountMigration,
        CapabilityKind::Cluster,
        CapabilityKind::Compliance,
        CapabilityKind::DataRetention,
        CapabilityKind::Elasticsearch,
        CapabilityKind::Ldap,
        CapabilityKind::MessageExport,
        CapabilityKind::Metrics,
        CapabilityKind::Mfa,
        CapabilityKind::Saml,
    ];

    /// Stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::AccountMigration => "account_migration",
            CapabilityKind::Cluster => "cluster",
            CapabilityKind::Compliance => "compliance",
            CapabilityKind::DataRetention => "data_retention",
            CapabilityKind::Elasticsearch => "elasticsearch",
            CapabilityKind::Ldap => "ldap",
            CapabilityKind::MessageExport => "message_export",
            CapabilityKind::Metrics => "metrics",
            CapabilityKind::Mfa => "mfa",
            CapabilityKind::Saml => "saml",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by capability start/stop.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The backing service could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backing service did not answer in time.
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    /// The backing service answered with a non-success status.
    #[error("rejected with status {status}")]
    Rejected { status: u16 },

    #[error("{0}")]
    Other(String),
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// A pluggable service that may be present in the process.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Which slot this implementation fills.
    fn kind(&self) -> CapabilityKind;

    async fn start(&self) -> CapabilityResult<()> {
        Ok(())
    }

    async fn stop(&self) -> CapabilityResult<()> {
        Ok(())
    }
}
