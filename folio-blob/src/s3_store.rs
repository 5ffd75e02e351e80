use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::ObjectStorageConfig;
use crate::store::{BlobBody, BlobStore, GetResult, ObjectHead, PutResult};
use crate::{BlobError, BlobResult};

/// S3-compatible object store (AWS, MinIO, RustFS, R2...).
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    /// Signs URLs against the endpoint clients can reach.
    presign_client: Client,
    bucket: String,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3BlobStore {
    pub async fn connect(config: &ObjectStorageConfig) -> Self {
        let client = Self::create_client(config, &config.endpoint).await;
        let presign_client = match config.public_endpoint.as_deref() {
            Some(public) if public != config.endpoint => Self::create_client(config, public).await,
            _ => client.clone(),
        };

        tracing::info!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            "object storage configured"
        );

        Self {
            client,
            presign_client,
            bucket: config.bucket.clone(),
        }
    }

    async fn create_client(config: &ObjectStorageConfig, endpoint: &str) -> Client {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "folio",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure onto the blob taxonomy by error code, then HTTP status.
fn classify<E>(key: &str, err: SdkError<E, HttpResponse>) -> BlobError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    match (err.code(), status) {
        (Some("NoSuchKey" | "NotFound" | "NoSuchBucket"), _) | (_, Some(404)) => {
            BlobError::not_found(key)
        }
        (Some("AccessDenied" | "Forbidden"), _) | (_, Some(403)) => BlobError::access_denied(key),
        _ => {
            tracing::debug!(key, error = %DisplayErrorContext(&err), "object storage call failed");
            BlobError::backend(err)
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> BlobResult<PutResult> {
        let size_bytes = body.len() as u64;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(AwsByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        Ok(PutResult {
            etag: result.e_tag,
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        let size_bytes = result.content_length.and_then(|n| u64::try_from(n).ok());
        let mut body = result.body;
        let stream = async_stream::stream! {
            while let Some(chunk) = body.next().await {
                yield chunk.map_err(std::io::Error::other);
            }
        };

        Ok(GetResult {
            body: BlobBody::Stream(Box::pin(stream)),
            size_bytes,
            content_type: result.content_type,
            etag: result.e_tag,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        Ok(ObjectHead {
            size_bytes: result.content_length.unwrap_or(0).max(0) as u64,
            content_type: result.content_type,
            etag: result.e_tag,
            last_modified: result.last_modified.map(|dt| dt.secs()),
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(key, e))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> BlobResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(BlobError::backend)?;
        let request = self
            .presign_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(request.uri().to_string())
    }
}
