//! Lazily persisted diagnostic identifier.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{StoreResult, SystemStore, DIAGNOSTIC_ID_KEY};

/// In-memory cache of the installation's diagnostic identifier.
///
/// Once a non-empty value is cached it is never fetched or regenerated
/// again. First-time loads are serialized so concurrent callers agree on
/// a single generated identifier.
#[derive(Debug, Default)]
pub struct DiagnosticId {
    cached: ArcSwapOption<String>,
    init: Mutex<()>,
}

impl DiagnosticId {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached identifier, if any.
    pub fn get(&self) -> Option<String> {
        let cached = self.cached.load();
        match &*cached {
            Some(id) if !id.is_empty() => Some(String::clone(id)),
            _ => None,
        }
    }

    /// Override the cached identifier without touching storage.
    pub fn set(&self, id: impl Into<String>) {
        self.cached.store(Some(Arc::new(id.into())));
    }

    /// Return the identifier, loading or generating and persisting it on
    /// first use. Nothing is cached if storage fails.
    pub async fn ensure(&self, store: &dyn SystemStore) -> StoreResult<String> {
        if let Some(id) = self.get() {
            return Ok(id);
        }

        let _guard = self.init.lock().await;
        if let Some(id) = self.get() {
            return Ok(id);
        }

        let id = match store.get(DIAGNOSTIC_ID_KEY).await? {
            Some(existing) if !existing.is_empty() => existing,
            _ => {
                let generated = new_id();
                store.save(DIAGNOSTIC_ID_KEY, &generated).await?;
                tracing::info!(diagnostic_id = %generated, "Generated diagnostic id");
                generated
            }
        };

        self.set(id.clone());
        Ok(id)
    }
}

/// A fresh random identifier (32 lowercase hex characters).
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
