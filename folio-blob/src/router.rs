use std::sync::Arc;

use bytes::Bytes;

use crate::config::StorageConfig;
use crate::local_store::LocalBlobStore;
use crate::s3_store::S3BlobStore;
use crate::sniff::VerifiedType;
use crate::store::BlobStore;
use crate::types::{extension_of, Backend, StorageDescriptor};
use crate::BlobResult;

/// Decides where each upload is written.
///
/// Object storage first when configured, the local upload directory when it
/// is not or when the object write fails.
#[derive(Clone)]
pub struct BlobStoreRouter {
    config: Arc<StorageConfig>,
    object: Option<Arc<dyn BlobStore>>,
    local: LocalBlobStore,
}

impl std::fmt::Debug for BlobStoreRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreRouter")
            .field("object", &self.object.as_ref().map(|s| s.name()))
            .field("local", &self.local.root())
            .finish()
    }
}

impl BlobStoreRouter {
    /// Use an explicit object store (or none).
    pub fn new(config: StorageConfig, object: Option<Arc<dyn BlobStore>>) -> Self {
        let local = LocalBlobStore::new(config.upload_dir.clone());
        Self {
            config: Arc::new(config),
            object,
            local,
        }
    }

    /// Connect to object storage when the configuration is complete.
    pub async fn from_config(config: StorageConfig) -> Self {
        let object = match config.object_storage.as_ref() {
            Some(os) => Some(Arc::new(S3BlobStore::connect(os).await) as Arc<dyn BlobStore>),
            None => {
                tracing::info!(dir = %config.upload_dir.display(), "object storage not configured, storing uploads locally");
                None
            }
        };
        Self::new(config, object)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn object_store(&self) -> Option<&Arc<dyn BlobStore>> {
        self.object.as_ref()
    }

    pub fn local_store(&self) -> &LocalBlobStore {
        &self.local
    }

    /// `<timestamp-millis>-<random>.<ext>`.
    pub fn unique_name(original: &str, verified: &VerifiedType) -> String {
        let ext = extension_of(original)
            .filter(|ext| verified.accepts_extension(ext))
            .unwrap_or_else(|| verified.extension().to_string());
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            &random[..12],
            ext
        )
    }

    /// Persist `bytes` and report where they went.
    pub async fn store(
        &self,
        bytes: Bytes,
        filename: &str,
        verified: &VerifiedType,
    ) -> BlobResult<StorageDescriptor> {
        let name = Self::unique_name(filename, verified);

        if let Some(object) = &self.object {
            let key = self.config.object_key(&name);
            match object.put(&key, verified.mime, bytes.clone()).await {
                Ok(put) => {
                    tracing::info!(key = %key, backend = %Backend::ObjectStorage, size = put.size_bytes, "stored upload");
                    return Ok(StorageDescriptor {
                        backend: Backend::ObjectStorage,
                        storage_key: key,
                        size: put.size_bytes,
                    });
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "object storage write failed, falling back to local disk");
                }
            }
        }

        let put = self.local.put(&name, verified.mime, bytes).await.map_err(|e| {
            tracing::error!(key = %name, error = %e, "local write failed");
            e
        })?;
        tracing::info!(key = %name, backend = %Backend::Local, size = put.size_bytes, "stored upload");

        Ok(StorageDescriptor {
            backend: Backend::Local,
            storage_key: name,
            size: put.size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::{sniff, ImageKind, JPEG, PNG};
    use crate::store::{GetResult, ObjectHead, PutResult};
    use crate::BlobError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingStore {
        fail: bool,
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn put(&self, key: &str, _ct: &str, body: Bytes) -> BlobResult<PutResult> {
            if self.fail {
                return Err(BlobError::backend(std::io::Error::other("bucket offline")));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(PutResult {
                etag: None,
                size_bytes: body.len() as u64,
            })
        }

        async fn get(&self, key: &str) -> BlobResult<GetResult> {
            Err(BlobError::not_found(key))
        }

        async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
            Err(BlobError::not_found(key))
        }

        async fn delete(&self, _key: &str) -> BlobResult<()> {
            Ok(())
        }
    }

    fn png() -> (Bytes, VerifiedType) {
        let bytes = Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47]);
        let verified = sniff(&bytes, Some(PNG)).unwrap();
        (bytes, verified)
    }

    #[test]
    fn names_keep_matching_extensions_only() {
        let jpeg = VerifiedType { mime: JPEG, kind: ImageKind::Raster };
        assert!(BlobStoreRouter::unique_name("me.JPEG", &jpeg).ends_with(".jpeg"));
        assert!(BlobStoreRouter::unique_name("me.png", &jpeg).ends_with(".jpg"));
        assert!(BlobStoreRouter::unique_name("noext", &jpeg).ends_with(".jpg"));

        let a = BlobStoreRouter::unique_name("a.jpg", &jpeg);
        let b = BlobStoreRouter::unique_name("a.jpg", &jpeg);
        assert_ne!(a, b);
        assert!(crate::types::is_safe_name(&a));
    }

    #[tokio::test]
    async fn local_only_without_object_storage() {
        let dir = TempDir::new().unwrap();
        let router = BlobStoreRouter::new(StorageConfig::new().with_upload_dir(dir.path()), None);
        let (bytes, verified) = png();

        let stored = router.store(bytes, "logo.png", &verified).await.unwrap();
        assert_eq!(stored.backend, Backend::Local);
        assert_eq!(stored.size, 4);
        assert!(dir.path().join(&stored.storage_key).is_file());
    }

    #[tokio::test]
    async fn object_storage_first_with_prefix() {
        let dir = TempDir::new().unwrap();
        let object = Arc::new(RecordingStore::default());
        let router = BlobStoreRouter::new(
            StorageConfig::new().with_upload_dir(dir.path()),
            Some(object.clone() as Arc<dyn BlobStore>),
        );
        let (bytes, verified) = png();

        let stored = router.store(bytes, "logo.png", &verified).await.unwrap();
        assert_eq!(stored.backend, Backend::ObjectStorage);
        assert!(stored.storage_key.starts_with("uploads/"));
        assert_eq!(*object.keys.lock().unwrap(), vec![stored.storage_key.clone()]);
        assert!(!dir.path().join(stored.file_name()).exists());
    }

    #[tokio::test]
    async fn object_failure_falls_back_to_local() {
        let dir = TempDir::new().unwrap();
        let object = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let router = BlobStoreRouter::new(
            StorageConfig::new().with_upload_dir(dir.path()),
            Some(object as Arc<dyn BlobStore>),
        );
        let (bytes, verified) = png();

        let stored = router.store(bytes, "logo.png", &verified).await.unwrap();
        assert_eq!(stored.backend, Backend::Local);
        assert!(dir.path().join(&stored.storage_key).is_file());
    }

    #[tokio::test]
    async fn local_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        // a regular file where the upload directory should be
        let blocker = dir.path().join("uploads");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let router = BlobStoreRouter::new(StorageConfig::new().with_upload_dir(&blocker), None);
        let (bytes, verified) = png();

        assert!(router.store(bytes, "logo.png", &verified).await.is_err());
    }
}
