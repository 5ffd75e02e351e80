use std::sync::Arc;

use anyhow::{Context, Result};
use folio_axum::middlewares::UploadedFile;
use folio_blob::{
    basename, sanitize_filename, sniff, Backend, BlobError, BlobStore, BlobStoreRouter,
    ImageNormalizer,
};
use folio_core::FolioError;
use serde::Serialize;

use super::uploads_repository::{UploadRecord, UploadsRepository};

/// What the client gets back after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

/// Image upload pipeline: sniff, normalize, store, record.
pub struct UploadsService {
    repo: Arc<UploadsRepository>,
    blobs: BlobStoreRouter,
    normalizer: ImageNormalizer,
}

impl UploadsService {
    pub fn new(
        repo: Arc<UploadsRepository>,
        blobs: BlobStoreRouter,
        normalizer: ImageNormalizer,
    ) -> Self {
        Self {
            repo,
            blobs,
            normalizer,
        }
    }

    pub async fn ingest(&self, file: UploadedFile) -> Result<UploadResponse> {
        let filename = sanitize_filename(file.file_name.as_deref().unwrap_or_default());

        let verified = sniff(&file.data, file.content_type.as_deref()).map_err(|e| match e {
            BlobError::UnsupportedType { detail } => {
                FolioError::bad_request(format!("Unsupported file type: {detail}")).into_anyhow()
            }
            other => anyhow::Error::new(other),
        })?;

        let normalized = self.normalizer.normalize(file.data, &verified).await;

        let stored = self
            .blobs
            .store(normalized.bytes, &filename, &verified)
            .await
            .context("storing upload")?;
        let name = stored.file_name().to_string();

        let record = UploadRecord::new(filename, verified.mime, stored);
        match self.repo.create(record.clone()).await {
            Ok(saved) => Ok(UploadResponse {
                url: format!("/photos/{}", saved.id),
                id: Some(saved.id),
                filename: saved.filename,
                mimetype: saved.mimetype,
                size: saved.size,
            }),
            Err(e) => {
                // the blob stays where it is; hand out a direct link instead
                tracing::warn!(key = %record.storage_key, error = %e, "upload metadata not saved");
                let url = self
                    .blobs
                    .config()
                    .public_url_for(&name)
                    .unwrap_or_else(|| format!("/uploads/{name}"));
                Ok(UploadResponse {
                    id: None,
                    url,
                    filename: record.filename,
                    mimetype: record.mimetype,
                    size: record.size,
                })
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<UploadRecord>> {
        self.repo.list().await
    }

    /// Delete the blob from its backend and the local directory, then the
    /// record. Only the record removal decides the outcome.
    pub async fn remove(&self, id: &str) -> Result<UploadRecord> {
        let record = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| FolioError::not_found(format!("No upload with id '{id}'")).into_anyhow())?;

        if record.backend == Backend::ObjectStorage {
            if let Some(object) = self.blobs.object_store() {
                if let Err(e) = object.delete(&record.storage_key).await {
                    tracing::warn!(key = %record.storage_key, error = %e, "object delete failed");
                }
            }
        }

        let local_name = basename(&record.storage_key);
        match self.blobs.local_store().delete(local_name).await {
            Ok(()) => tracing::debug!(key = %local_name, "local copy deleted"),
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(key = %local_name, error = %e, "local delete failed"),
        }

        self.repo
            .remove(id)
            .await?
            .ok_or_else(|| FolioError::not_found(format!("No upload with id '{id}'")).into_anyhow())
    }
}
