use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use folio_axum::middlewares::{collect_files, MultipartLimits};
use folio_axum::FolioAxumResult;
use folio_core::FolioError;

use super::uploads_repository::UploadRecord;
use super::uploads_service::{UploadResponse, UploadsService};
use crate::auth::{require_admin, AuthGate};

#[derive(Clone)]
struct UploadsState {
    service: Arc<UploadsService>,
    limits: MultipartLimits,
}

/// Admin upload endpoints.
pub fn router(
    service: Arc<UploadsService>,
    auth: Arc<dyn AuthGate>,
    limits: MultipartLimits,
) -> Router {
    Router::new()
        .route("/api/uploads", post(upload))
        .route("/api/admin/uploads", get(list))
        .route("/api/admin/uploads/{id}", delete(remove))
        .route_layer(middleware::from_fn_with_state(auth, require_admin))
        .with_state(UploadsState { service, limits })
}

async fn upload(
    State(state): State<UploadsState>,
    headers: HeaderMap,
    body: Body,
) -> FolioAxumResult<Json<UploadResponse>> {
    let mut files = collect_files(&headers, body, &state.limits).await?;

    // the `file` field when present, otherwise the first file
    let idx = files.iter().position(|f| f.field_name == "file").unwrap_or(0);
    if files.is_empty() {
        return Err(FolioError::bad_request("No file uploaded").into());
    }
    let file = files.swap_remove(idx);

    Ok(Json(state.service.ingest(file).await?))
}

async fn list(State(state): State<UploadsState>) -> FolioAxumResult<Json<Vec<UploadRecord>>> {
    Ok(Json(state.service.list().await?))
}

async fn remove(
    State(state): State<UploadsState>,
    Path(id): Path<String>,
) -> FolioAxumResult<Json<UploadRecord>> {
    Ok(Json(state.service.remove(&id).await?))
}
