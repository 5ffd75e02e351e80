//! Read path for uploaded images.
//!
//! `/photos/{id}` always answers with a redirect (public base URL, presigned
//! object URL or the `/uploads` proxy). `/uploads/{name}` streams the bytes,
//! from object storage first and the local directory second.

use std::sync::Arc;

use anyhow::Result;
use folio_blob::{is_safe_name, Backend, BlobBody, BlobStore, BlobStoreRouter, GetResult};
use folio_core::FolioError;

use crate::services::uploads::UploadsRepository;

/// Outcome of resolving a photo identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Redirect(String),
    NotFound,
}

/// Bytes ready to be written to the client.
#[derive(Debug)]
pub struct ServedFile {
    pub body: BlobBody,
    pub content_type: String,
    pub size: Option<u64>,
}

pub struct PhotoResolver {
    repo: Arc<UploadsRepository>,
    blobs: BlobStoreRouter,
}

impl PhotoResolver {
    pub fn new(repo: Arc<UploadsRepository>, blobs: BlobStoreRouter) -> Self {
        Self { repo, blobs }
    }

    pub async fn resolve(&self, ident: &str) -> Resolution {
        if uuid::Uuid::parse_str(ident).is_ok() {
            match self.repo.get(ident).await {
                Ok(Some(record)) => {
                    let url = self
                        .redirect_for(record.file_name(), record.backend, &record.storage_key)
                        .await;
                    return Resolution::Redirect(url);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(id = %ident, error = %e, "upload metadata lookup failed");
                }
            }
        }

        self.resolve_raw_name(ident).await
    }

    /// Identifiers without a record may still be file names from the
    /// degraded upload path.
    async fn resolve_raw_name(&self, name: &str) -> Resolution {
        if !is_safe_name(name) {
            return Resolution::NotFound;
        }

        if let Some(object) = self.blobs.object_store() {
            let key = self.blobs.config().object_key(name);
            match object.head(&key).await {
                Ok(_) => {
                    return Resolution::Redirect(
                        self.redirect_for(name, Backend::ObjectStorage, &key).await,
                    )
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "object head failed"),
            }
        }

        if self.blobs.local_store().exists(name).await {
            return Resolution::Redirect(self.redirect_for(name, Backend::Local, name).await);
        }

        Resolution::NotFound
    }

    async fn redirect_for(&self, name: &str, backend: Backend, storage_key: &str) -> String {
        let config = self.blobs.config();
        if let Some(url) = config.public_url_for(name) {
            return url;
        }

        if backend == Backend::ObjectStorage && config.presigning_enabled() {
            if let Some(object) = self.blobs.object_store() {
                match object.presign_get(storage_key, config.presign_expiry).await {
                    Ok(url) => return url,
                    Err(e) => {
                        tracing::warn!(key = %storage_key, error = %e, "presign failed, using proxy");
                    }
                }
            }
        }

        format!("/uploads/{name}")
    }

    /// Fetch `name` for the `/uploads` proxy.
    pub async fn open(&self, name: &str) -> Result<ServedFile> {
        if !is_safe_name(name) {
            return Err(not_found(name));
        }

        let mut object_error = None;
        if let Some(object) = self.blobs.object_store() {
            let key = self.blobs.config().object_key(name);
            match object.get(&key).await {
                Ok(got) => return Ok(served(name, got)),
                Err(e) if e.is_access_denied() => {
                    tracing::warn!(key = %key, "object storage denied access");
                    return Err(FolioError::forbidden("Access denied").into_anyhow());
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(key = %key, "not in object storage, trying local");
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "object read failed, trying local");
                    object_error = Some(e);
                }
            }
        }

        match self.blobs.local_store().get(name).await {
            Ok(got) => Ok(served(name, got)),
            Err(e) if e.is_not_found() => match object_error {
                Some(original) => Err(anyhow::Error::new(original).context("reading upload")),
                None => Err(not_found(name)),
            },
            Err(e) => Err(anyhow::Error::new(e).context("reading local upload")),
        }
    }
}

fn not_found(name: &str) -> anyhow::Error {
    FolioError::not_found(format!("No such file: {name}")).into_anyhow()
}

fn served(name: &str, got: GetResult) -> ServedFile {
    let content_type = got
        .content_type
        .filter(|ct| {
            !ct.trim().is_empty() && ct != "application/octet-stream" && ct != "binary/octet-stream"
        })
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

    ServedFile {
        body: got.body,
        content_type,
        size: got.size_bytes,
    }
}
