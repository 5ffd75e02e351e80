use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use folio_axum::middlewares::{collect_files, MultipartLimits};
use folio_axum::FolioAxumResult;
use serde_json::{json, Value};

use super::posts_schema::PostDocument;
use super::posts_service::PostsService;
use crate::auth::{require_admin, AuthGate};

#[derive(Clone)]
struct PostsState {
    service: Arc<PostsService>,
    limits: MultipartLimits,
}

pub fn router(service: Arc<PostsService>, auth: Arc<dyn AuthGate>, limits: MultipartLimits) -> Router {
    let state = PostsState { service, limits };

    let admin = Router::new()
        .route("/api/admin/posts/upload", post(upload_batch))
        .route_layer(middleware::from_fn_with_state(auth, require_admin));

    Router::new()
        .route("/api/posts", get(list))
        .merge(admin)
        .with_state(state)
}

async fn upload_batch(
    State(state): State<PostsState>,
    headers: HeaderMap,
    body: Body,
) -> FolioAxumResult<Json<Value>> {
    let files = collect_files(&headers, body, &state.limits).await?;
    let saved = state.service.ingest_batch(files).await?;
    Ok(Json(json!({ "saved": saved })))
}

async fn list(State(state): State<PostsState>) -> FolioAxumResult<Json<Vec<PostDocument>>> {
    Ok(Json(state.service.list_visible().await?))
}
