//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! application. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration snapshot.
///
/// A snapshot is never mutated once it has been handed to the application;
/// a change is always a wholesale replacement by a new snapshot.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Search indexing settings.
    pub search: SearchSettings,

    /// Background job settings.
    pub jobs: JobSettings,

    /// System properties storage.
    pub store: StoreSettings,

    /// License file location.
    pub license: LicenseSettings,

    /// Background task pool settings.
    pub lifecycle: LifecycleSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Search engine settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Enable indexing into the search engine.
    pub enable_indexing: bool,

    /// Search engine base URL.
    pub connection_url: String,

    /// Basic auth username.
    pub username: String,

    /// Basic auth password.
    pub password: String,

    /// Let the client discover the other cluster nodes.
    pub sniff: bool,

    /// Timeout for connectivity probes in seconds.
    pub request_timeout_secs: u64,
}

impl SearchSettings {
    /// True when any parameter used to reach the search engine differs.
    pub fn connection_changed(&self, other: &SearchSettings) -> bool {
        self.connection_url != other.connection_url
            || self.username != other.username
            || self.password != other.password
            || self.sniff != other.sniff
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enable_indexing: false,
            connection_url: "http://localhost:9200".to_string(),
            username: "elastic".to_string(),
            password: "changeme".to_string(),
            sniff: true,
            request_timeout_secs: 30,
        }
    }
}

/// Job server settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct JobSettings {
    /// Run job workers in this process.
    pub run_jobs: bool,

    /// Run job schedulers in this process.
    pub run_scheduler: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            run_jobs: true,
            run_scheduler: true,
        }
    }
}

/// System properties store settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the JSON properties file. In-memory storage when unset.
    pub path: Option<String>,
}

/// License settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LicenseSettings {
    /// Path to the license file (JSON). Unlicensed when unset.
    pub path: Option<String>,
}

/// Task pool settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleSettings {
    /// Grace period for background tasks at shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 15,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
