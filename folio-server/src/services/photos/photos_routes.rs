use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use folio_axum::{FolioAxumError, FolioAxumResult};
use folio_blob::BlobBody;
use folio_core::FolioError;

use super::photos_resolver::{PhotoResolver, Resolution, ServedFile};

const CACHE_FOREVER: &str = "public, max-age=31536000, immutable";
const SVG_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; sandbox";

/// Public read endpoints.
pub fn router(resolver: Arc<PhotoResolver>) -> Router {
    Router::new()
        .route("/photos/{id}", get(photo))
        .route("/uploads/{name}", get(upload_file))
        .with_state(resolver)
}

async fn photo(
    State(resolver): State<Arc<PhotoResolver>>,
    Path(id): Path<String>,
) -> FolioAxumResult<Response> {
    match resolver.resolve(&id).await {
        Resolution::Redirect(url) => {
            let location = HeaderValue::try_from(url).map_err(|e| {
                FolioAxumError::from(anyhow::Error::new(e).context("redirect target"))
            })?;
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        Resolution::NotFound => {
            Err(FolioError::not_found(format!("No photo '{id}'")).into())
        }
    }
}

async fn upload_file(
    State(resolver): State<Arc<PhotoResolver>>,
    Path(name): Path<String>,
) -> FolioAxumResult<Response> {
    let file = resolver.open(&name).await?;
    Ok(file_response(file))
}

fn file_response(file: ServedFile) -> Response {
    let is_svg = file.content_type == "image/svg+xml";
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CACHE_CONTROL, CACHE_FOREVER)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    if is_svg {
        builder = builder.header(header::CONTENT_SECURITY_POLICY, SVG_CSP);
    }

    let body = match file.body {
        BlobBody::Stream(stream) => {
            if let Some(size) = file.size {
                builder = builder.header(header::CONTENT_LENGTH, size);
            }
            Body::from_stream(stream)
        }
        BlobBody::Buffered(bytes) => {
            builder = builder.header(header::CONTENT_LENGTH, bytes.len());
            Body::from(bytes)
        }
    };

    builder.body(body).unwrap_or_else(|e| {
        FolioAxumError::from(anyhow::Error::new(e).context("building file response")).into_response()
    })
}
