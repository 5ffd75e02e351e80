use std::path::PathBuf;
use std::time::Duration;

/// S3-compatible connection settings. Present only when fully configured.
#[derive(Clone)]
pub struct ObjectStorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub force_path_style: bool,
    /// Endpoint clients can reach, used when presigning.
    pub public_endpoint: Option<String>,
}

impl std::fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .field("public_endpoint", &self.public_endpoint)
            .finish()
    }
}

/// Everything the upload router and the retrieval resolver need to know
/// about where blobs live.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `None` means local-only mode.
    pub object_storage: Option<ObjectStorageConfig>,

    /// Base URL that serves `/uploads/<name>` publicly (CDN, bucket website).
    pub public_base_url: Option<String>,

    /// Directory for local blobs.
    pub upload_dir: PathBuf,

    /// Prefix for object keys.
    pub key_prefix: String,

    pub presign_expiry: Duration,

    /// Host substrings that mark a local/dev object store (no presigning).
    pub local_dev_markers: Vec<String>,

    /// Largest accepted upload.
    pub max_upload_bytes: u64,

    /// Longest raster side after normalization.
    pub max_image_dimension: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            object_storage: None,
            public_base_url: None,
            upload_dir: PathBuf::from("uploads"),
            key_prefix: "uploads".to_string(),
            presign_expiry: Duration::from_secs(3600),
            local_dev_markers: vec![
                "minio".to_string(),
                "localhost".to_string(),
                "127.0.0.1".to_string(),
            ],
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            max_image_dimension: 2048,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable object storage only when every credential is present.
    ///
    /// Blank values count as missing.
    pub fn with_object_storage_parts(
        mut self,
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        bucket: Option<String>,
    ) -> Self {
        fn present(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        self.object_storage = match (
            present(endpoint),
            present(access_key),
            present(secret_key),
            present(bucket),
        ) {
            (Some(endpoint), Some(access_key), Some(secret_key), Some(bucket)) => {
                Some(ObjectStorageConfig {
                    endpoint,
                    region: "us-east-1".to_string(),
                    bucket,
                    access_key,
                    secret_key,
                    force_path_style: true,
                    public_endpoint: None,
                })
            }
            _ => None,
        };
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        if let Some(os) = self.object_storage.as_mut() {
            os.region = region.into();
        }
        self
    }

    pub fn with_force_path_style(mut self, force: bool) -> Self {
        if let Some(os) = self.object_storage.as_mut() {
            os.force_path_style = force;
        }
        self
    }

    pub fn with_public_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(os) = self.object_storage.as_mut() {
            os.public_endpoint = endpoint.filter(|s| !s.trim().is_empty());
        }
        self
    }

    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    pub fn with_local_dev_markers(mut self, markers: Vec<String>) -> Self {
        self.local_dev_markers = markers;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_max_image_dimension(mut self, px: u32) -> Self {
        self.max_image_dimension = px;
        self
    }

    pub fn object_storage_configured(&self) -> bool {
        self.object_storage.is_some()
    }

    /// Object key for a public file name.
    pub fn object_key(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key_prefix, name)
        }
    }

    /// Whether `hostname` looks like a local/dev object store.
    pub fn is_local_dev_endpoint(&self, hostname: &str) -> bool {
        let host = hostname.to_ascii_lowercase();
        self.local_dev_markers
            .iter()
            .any(|m| !m.is_empty() && host.contains(&m.to_ascii_lowercase()))
    }

    /// Host of the configured endpoint, if object storage is on.
    pub fn endpoint_host(&self) -> Option<String> {
        let os = self.object_storage.as_ref()?;
        let parsed = url::Url::parse(&os.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        // endpoints configured without a scheme ("minio:9000") have no host
        Some(parsed.unwrap_or_else(|| {
            os.endpoint
                .split(['/', ':'])
                .next()
                .unwrap_or_default()
                .to_string()
        }))
    }

    /// Presigned redirects are only worth it against a real, reachable store.
    pub fn presigning_enabled(&self) -> bool {
        match self.endpoint_host() {
            Some(host) => !self.is_local_dev_endpoint(&host),
            None => false,
        }
    }

    /// `<public_base_url>/uploads/<name>`, if a public base URL is set.
    pub fn public_url_for(&self, name: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/uploads/{name}"))
    }
}
