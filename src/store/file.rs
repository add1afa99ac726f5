//! JSON-file backed system properties.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::store::{StoreResult, SystemStore};

/// Durable store persisting every property to one JSON file.
///
/// The whole map is rewritten on each save via a temp file and rename, so
/// a crash mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    props: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading it if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let props = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = ?path, properties = props.len(), "Opened system properties file");
        Ok(Self {
            path,
            props: Mutex::new(props),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, props: &HashMap<String, String>) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(props)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SystemStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.props.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut props = self.props.lock().await;
        let previous = props.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&props).await {
            // Keep memory consistent with disk.
            match previous {
                Some(v) => props.insert(key.to_string(), v),
                None => props.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn get_all(&self) -> StoreResult<HashMap<String, String>> {
        Ok(self.props.lock().await.clone())
    }
}
