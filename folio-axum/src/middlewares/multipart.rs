//! Multipart file intake backed by `multer`.
//!
//! Handlers take the raw [`Body`] and [`HeaderMap`] and get back the file
//! parts in memory. Size limits are enforced while streaming, so an
//! oversized request is cut off instead of buffered.

use axum::body::Body;
use axum::http::{header, HeaderMap};
use bytes::{Bytes, BytesMut};
use folio_core::FolioError;

/// One file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct MultipartLimits {
    /// Maximum bytes in one file part.
    pub max_file_size: u64,
    /// Maximum bytes in the whole request body.
    pub max_total_size: u64,
    /// Maximum number of file parts.
    pub max_files: usize,
}

impl Default for MultipartLimits {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,  // 10MB
            max_total_size: 12 * 1024 * 1024, // room for part headers
            max_files: 1,
        }
    }
}

impl MultipartLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = size;
        self
    }

    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }
}

fn map_multer(err: multer::Error) -> anyhow::Error {
    match err {
        multer::Error::FieldSizeExceeded { limit, field_name } => FolioError::payload_too_large(
            format!(
                "File '{}' exceeds the maximum size of {limit} bytes",
                field_name.unwrap_or_default()
            ),
        )
        .into_anyhow(),
        multer::Error::StreamSizeExceeded { limit } => {
            FolioError::payload_too_large(format!("Request exceeds the maximum size of {limit} bytes"))
                .into_anyhow()
        }
        other => FolioError::bad_request(format!("Failed to parse multipart data: {other}"))
            .into_anyhow(),
    }
}

/// Read every file part (a part with a file name) of a `multipart/form-data`
/// request. Plain text parts are skipped.
pub async fn collect_files(
    headers: &HeaderMap,
    body: Body,
    limits: &MultipartLimits,
) -> anyhow::Result<Vec<UploadedFile>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let boundary = multer::parse_boundary(content_type).map_err(|_| {
        FolioError::bad_request("Expected a multipart/form-data request").into_anyhow()
    })?;

    let constraints = multer::Constraints::new().size_limit(
        multer::SizeLimit::new()
            .whole_stream(limits.max_total_size)
            .per_field(limits.max_file_size),
    );
    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut files = Vec::new();
    while let Some(mut field) = multipart.next_field().await.map_err(map_multer)? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        if file_name.is_none() {
            // drain so the parser can move on
            while field.chunk().await.map_err(map_multer)?.is_some() {}
            continue;
        }

        if files.len() >= limits.max_files {
            return Err(FolioError::bad_request(format!(
                "Too many files, at most {} allowed",
                limits.max_files
            ))
            .into_anyhow());
        }

        let content_type = field.content_type().map(|m| m.to_string());
        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(map_multer)? {
            data.extend_from_slice(&chunk);
        }

        tracing::debug!(field = %field_name, file = ?file_name, size = data.len(), "received file part");
        files.push(UploadedFile {
            field_name,
            file_name,
            content_type,
            data: data.freeze(),
        });
    }

    Ok(files)
}
