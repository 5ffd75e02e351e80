//! # folio-blob: upload ingestion and blob storage for Folio
//!
//! Everything between "some bytes arrived" and "here is where they live":
//!
//! - **Sniffing**: the stored MIME type comes from the content ([`sniff()`]),
//!   never from the client.
//! - **Normalization**: oversized rasters are shrunk when the `resize`
//!   feature is on; any failure keeps the original bytes.
//! - **Routing**: [`BlobStoreRouter`] writes to S3-compatible storage when it
//!   is configured and falls back to the local upload directory.
//!
//! ```text
//! ┌─────────────────┐
//! │     sniff       │  ← verified MIME type
//! ├─────────────────┤
//! │ ImageNormalizer │  ← bounded resize or passthrough
//! ├─────────────────┤
//! │ BlobStoreRouter │  ← object storage, then local disk
//! ├─────────────────┤
//! │   BlobStore     │  ← S3BlobStore / LocalBlobStore
//! └─────────────────┘
//! ```
//!
//! ```rust,no_run
//! use folio_blob::prelude::*;
//!
//! # async fn run(bytes: bytes::Bytes) -> BlobResult<()> {
//! let config = StorageConfig::new().with_upload_dir("uploads");
//! let router = BlobStoreRouter::from_config(config).await;
//! let normalizer = ImageNormalizer::new(2048);
//!
//! let verified = sniff(&bytes, Some("image/png"))?;
//! let normalized = normalizer.normalize(bytes, &verified).await;
//! let stored = router.store(normalized.bytes, "photo.png", &verified).await?;
//! println!("{} {}", stored.backend, stored.storage_key);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod local_store;
pub mod normalize;
mod router;
mod s3_store;
pub mod sniff;
pub mod store;
mod types;

pub use config::{ObjectStorageConfig, StorageConfig};
pub use error::{BlobError, BlobResult};
pub use local_store::LocalBlobStore;
pub use normalize::{ImageNormalizer, ImagePipeline, Normalized, PassthroughPipeline};
pub use router::BlobStoreRouter;
pub use s3_store::S3BlobStore;
pub use sniff::{sniff, ImageKind, VerifiedType};
pub use store::{BlobBody, BlobStore, GetResult, ObjectHead, PutResult};
pub use types::{
    basename, extension_of, is_safe_name, sanitize_filename, Backend, ByteStream,
    StorageDescriptor,
};

#[cfg(feature = "resize")]
pub use normalize::ResizePipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        sniff, Backend, BlobError, BlobResult, BlobStore, BlobStoreRouter, ImageNormalizer,
        StorageConfig, StorageDescriptor, VerifiedType,
    };
}
