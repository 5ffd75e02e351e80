use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while ingesting, storing or reading blobs
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {key}")]
    NotFound { key: String },

    #[error("Access denied: {key}")]
    AccessDenied { key: String },

    #[error("Unsupported file type: {detail}")]
    UnsupportedType { detail: String },

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Operation not supported by this store")]
    Unsupported,

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn access_denied<S: Into<String>>(key: S) -> Self {
        Self::AccessDenied { key: key.into() }
    }

    pub fn unsupported_type<S: Into<String>>(detail: S) -> Self {
        Self::UnsupportedType {
            detail: detail.into(),
        }
    }

    /// `true` for "the object is not there" (S3 `NoSuchKey`, missing file).
    pub fn is_not_found(&self) -> bool {
        match self {
            BlobError::NotFound { .. } => true,
            BlobError::Io { source } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        match self {
            BlobError::AccessDenied { .. } => true,
            BlobError::Io { source } => source.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}
