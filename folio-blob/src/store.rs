use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobError, BlobResult, ByteStream};

/// Storage primitives every backend implements.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Store a blob under `key`.
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> BlobResult<PutResult>;

    /// Fetch a blob.
    async fn get(&self, key: &str) -> BlobResult<GetResult>;

    /// Metadata without content.
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Delete a blob.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Time-limited direct download URL.
    async fn presign_get(&self, _key: &str, _expires_in: Duration) -> BlobResult<String> {
        Err(BlobError::Unsupported)
    }
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Content of a fetched blob.
///
/// Backends hand content back either as a stream or as one in-memory
/// value; readers have to cope with both.
pub enum BlobBody {
    Stream(ByteStream),
    Buffered(Bytes),
}

impl std::fmt::Debug for BlobBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobBody::Stream(_) => f.write_str("BlobBody::Stream(..)"),
            BlobBody::Buffered(b) => write!(f, "BlobBody::Buffered({} bytes)", b.len()),
        }
    }
}

/// Result of a get operation
#[derive(Debug)]
pub struct GetResult {
    pub body: BlobBody,
    pub size_bytes: Option<u64>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<i64>,
}
