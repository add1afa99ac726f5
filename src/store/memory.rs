//! In-memory system properties.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::{StoreResult, SystemStore};

/// A thread-safe, non-durable store.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SystemStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_all(&self) -> StoreResult<HashMap<String, String>> {
        Ok(self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect())
    }
}
