//! Config and license change fan-out.

use std::sync::{Arc, RwLock, PoisonError};
use thiserror::Error;

use crate::config::AppConfig;

/// Error returned by a listener that could not handle a change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("listener '{listener}' failed: {message}")]
pub struct ListenerError {
    pub listener: String,
    pub message: String,
}

impl ListenerError {
    pub fn new(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

/// Callback invoked with the `(old, new)` snapshot pair.
pub type ConfigListener =
    Arc<dyn Fn(&AppConfig, &AppConfig) -> Result<(), ListenerError> + Send + Sync>;

/// Callback invoked after the license changed.
pub type LicenseListener = Arc<dyn Fn() -> Result<(), ListenerError> + Send + Sync>;

/// Ordered, append-only listener registries.
///
/// Firing is synchronous on the caller's thread, in registration order.
/// The first failing listener stops the fan-out and its error is returned
/// to the caller; nothing is caught or retried here.
#[derive(Default)]
pub struct EventBus {
    config_listeners: RwLock<Vec<ConfigListener>>,
    license_listeners: RwLock<Vec<LicenseListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_config_listener<F>(&self, listener: F)
    where
        F: Fn(&AppConfig, &AppConfig) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.config_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn add_license_listener<F>(&self, listener: F)
    where
        F: Fn() -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.license_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Invoke every config listener with `(old, new)`.
    pub fn fire_config_change(&self, old: &AppConfig, new: &AppConfig) -> Result<(), ListenerError> {
        // Snapshot the registry so listeners may register others while firing.
        let listeners = self
            .config_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::debug!(listeners = listeners.len(), "Dispatching config change");
        for listener in &listeners {
            listener(old, new)?;
        }
        Ok(())
    }

    /// Invoke every license listener.
    pub fn fire_license_change(&self) -> Result<(), ListenerError> {
        let listeners = self
            .license_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::debug!(listeners = listeners.len(), "Dispatching license change");
        for listener in &listeners {
            listener()?;
        }
        Ok(())
    }

    pub fn config_listener_count(&self) -> usize {
        self.config_listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn license_listener_count(&self) -> usize {
        self.license_listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config_listeners", &self.config_listener_count())
            .field("license_listeners", &self.license_listener_count())
            .finish()
    }
}
