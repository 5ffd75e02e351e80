//! Whole-document JSON storage keyed by string.
//!
//! Documents are read and written as a unit; there are no partial updates.
//! Callers that read-modify-write a document are responsible for
//! serializing those sequences.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::FolioError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a document, `None` when it was never written.
    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Replace a document.
    async fn write(&self, key: &str, value: Value) -> Result<()>;

    /// Delete a document. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if ok {
        Ok(())
    } else {
        Err(FolioError::bad_request(format!("Invalid document key: {key:?}")).into_anyhow())
    }
}

/// In-process store, mainly for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        validate_key(key)?;
        self.docs.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.docs.write().await.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per document under a data directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written document.
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating data directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp = self
            .root
            .join(format!(".{key}.json.{}", uuid::Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", path.display()));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("deleting {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryKeyValueStore::new();
        assert!(store.read("posts").await.unwrap().is_none());

        store.write("posts", json!([{"id": "a"}])).await.unwrap();
        assert_eq!(store.read("posts").await.unwrap(), Some(json!([{"id": "a"}])));

        store.delete("posts").await.unwrap();
        store.delete("posts").await.unwrap();
        assert!(store.read("posts").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileKeyValueStore::open(dir.path()).await.unwrap();
            store.write("uploads", json!([1, 2, 3])).await.unwrap();
        }

        let store = FileKeyValueStore::open(dir.path()).await.unwrap();
        assert_eq!(store.read("uploads").await.unwrap(), Some(json!([1, 2, 3])));
        assert!(dir.path().join("uploads.json").exists());
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_data_dir() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(dir.path()).await.unwrap();

        let err = store.write("../etc/passwd", json!({})).await.unwrap_err();
        assert_eq!(FolioError::find_in(&err).unwrap().code(), 400);
    }
}
