use std::sync::Arc;

use axum::Router;
use folio_axum::middlewares::MultipartLimits;
use folio_blob::{BlobStoreRouter, ImageNormalizer};
use folio_core::{FolioConfigSnapshot, KeyValueStore};

use crate::auth::AuthGate;
use crate::markdown::MarkdownRenderer;

pub mod adapters;
pub mod photos;
pub mod posts;
pub mod uploads;

/// Multipart overhead allowed on top of the file payload.
const MULTIPART_SLACK_BYTES: u64 = 64 * 1024;
const MAX_UPLOAD_PARTS: usize = 4;
const MAX_POST_FILES: usize = 50;

/// Collaborators shared by every service.
pub struct FolioState {
    pub config: FolioConfigSnapshot,
    pub kv: Arc<dyn KeyValueStore>,
    pub blobs: BlobStoreRouter,
    pub normalizer: ImageNormalizer,
    pub auth: Arc<dyn AuthGate>,
    pub renderer: Arc<dyn MarkdownRenderer>,
}

pub struct FolioServices {
    pub uploads: Arc<uploads::UploadsService>,
    pub photos: Arc<photos::PhotoResolver>,
    pub posts: Arc<posts::PostsService>,
}

pub fn configure(state: &FolioState) -> FolioServices {
    let repo = Arc::new(uploads::UploadsRepository::new(Arc::clone(&state.kv)));

    let defaults = posts::PostDefaults {
        hidden: state.config.get_bool("posts.default_hidden").unwrap_or(false),
        tags: state.config.get_list("posts.default_tags"),
    };

    FolioServices {
        uploads: Arc::new(uploads::UploadsService::new(
            Arc::clone(&repo),
            state.blobs.clone(),
            state.normalizer.clone(),
        )),
        photos: Arc::new(photos::PhotoResolver::new(repo, state.blobs.clone())),
        posts: Arc::new(posts::PostsService::new(
            Arc::clone(&state.kv),
            Arc::clone(&state.renderer),
            defaults,
        )),
    }
}

/// All HTTP routes of the application.
pub fn routes(state: &FolioState, services: FolioServices) -> Router {
    let max_upload = state.blobs.config().max_upload_bytes;
    let upload_limits = MultipartLimits::new()
        .max_file_size(max_upload)
        .max_total_size(max_upload.saturating_add(MULTIPART_SLACK_BYTES))
        .max_files(MAX_UPLOAD_PARTS);

    let max_batch = state
        .config
        .get_u64("posts.max_batch_bytes")
        .unwrap_or(5 * 1024 * 1024);
    let post_limits = MultipartLimits::new()
        .max_file_size(max_batch)
        .max_total_size(max_batch.saturating_add(MULTIPART_SLACK_BYTES))
        .max_files(MAX_POST_FILES);

    Router::new()
        .merge(uploads::uploads_routes::router(
            services.uploads,
            Arc::clone(&state.auth),
            upload_limits,
        ))
        .merge(photos::photos_routes::router(services.photos))
        .merge(posts::posts_routes::router(
            services.posts,
            Arc::clone(&state.auth),
            post_limits,
        ))
}
