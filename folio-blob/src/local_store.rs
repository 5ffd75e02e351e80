use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::store::{BlobBody, BlobStore, GetResult, ObjectHead, PutResult};
use crate::types::is_safe_name;
use crate::{BlobError, BlobResult};

/// Blobs as plain files in one flat directory.
///
/// Keys are bare file names; anything that could leave the directory is
/// refused before touching the filesystem.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        if !is_safe_name(key) {
            return Err(BlobError::invalid(format!("unsafe local key: {key:?}")));
        }
        Ok(self.root.join(key))
    }

    /// Whether `key` names an existing regular file.
    pub async fn exists(&self, key: &str) -> bool {
        match self.path_for(key) {
            Ok(path) => fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Writes all of `body`; on failure the partial file at `path` is removed.
async fn write_or_discard<W>(path: &Path, file: &mut W, body: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(body).await?;
        file.flush().await
    }
    .await;

    if let Err(err) = written {
        if let Err(cleanup) = fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial blob");
        }
        return Err(err);
    }
    Ok(())
}

fn not_found_or_io(key: &str, err: std::io::Error) -> BlobError {
    if err.kind() == std::io::ErrorKind::NotFound {
        BlobError::not_found(key)
    } else {
        BlobError::from(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &'static str {
        "local"
    }

    /// Never overwrites: an existing file with the same name is an error.
    async fn put(&self, key: &str, _content_type: &str, body: Bytes) -> BlobResult<PutResult> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_discard(&path, &mut file, &body).await?;

        tracing::debug!(key, path = %path.display(), size = body.len(), "wrote local blob");
        Ok(PutResult {
            etag: None,
            size_bytes: body.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        let path = self.path_for(key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(BlobError::not_found(key));
        }

        Ok(GetResult {
            body: BlobBody::Stream(Box::pin(ReaderStream::new(file))),
            size_bytes: Some(meta.len()),
            content_type: Some(guess_content_type(key)),
            etag: None,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let path = self.path_for(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        if !meta.is_file() {
            return Err(BlobError::not_found(key));
        }

        let last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        Ok(ObjectHead {
            size_bytes: meta.len(),
            content_type: Some(guess_content_type(key)),
            etag: None,
            last_modified,
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))
    }
}
