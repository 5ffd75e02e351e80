use std::sync::Arc;

use anyhow::Result;
use folio_blob::{basename, Backend, StorageDescriptor};
use folio_core::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::services::adapters::document_adapter::{DocumentCollection, Identified};

const UPLOADS_DOCUMENT: &str = "uploads";

/// One stored binary asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
    pub storage_key: String,
    pub backend: Backend,
    pub created_at: String,
}

impl UploadRecord {
    pub fn new(filename: String, mimetype: &str, stored: StorageDescriptor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename,
            mimetype: mimetype.to_string(),
            size: stored.size,
            storage_key: stored.storage_key,
            backend: stored.backend,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Public file name, the same on every backend.
    pub fn file_name(&self) -> &str {
        basename(&self.storage_key)
    }
}

impl Identified for UploadRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Upload metadata persisted through the key/value store.
pub struct UploadsRepository {
    docs: DocumentCollection<UploadRecord>,
}

impl UploadsRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            docs: DocumentCollection::new(kv, UPLOADS_DOCUMENT),
        }
    }

    pub async fn create(&self, record: UploadRecord) -> Result<UploadRecord> {
        self.docs.insert(record).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<UploadRecord>> {
        self.docs.get(id).await
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<UploadRecord>> {
        let mut records = self.docs.find().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    pub async fn remove(&self, id: &str) -> Result<Option<UploadRecord>> {
        self.docs.remove(id).await
    }
}
