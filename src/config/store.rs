//! Current configuration snapshot holder.

use std::sync::Arc;
use arc_swap::ArcSwap;

use crate::config::schema::AppConfig;

/// Holds the live configuration snapshot.
///
/// Readers get a cheap `Arc` to an immutable snapshot. Replacement is a single
/// atomic swap, so concurrent writers are linearized and each one observes
/// exactly the snapshot it replaced.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<AppConfig>,
}

impl ConfigStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<AppConfig> {
        self.current.load_full()
    }

    /// Install `new` and return the snapshot it replaced.
    pub fn replace(&self, new: Arc<AppConfig>) -> Arc<AppConfig> {
        self.current.swap(new)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
