//! Folio content backend: image uploads, photo delivery and markdown posts.
//!
//! [`build`] wires the production collaborators from environment
//! configuration. [`build_with`] takes an explicit configuration, document
//! store and object store, which is what the HTTP tests use.

pub mod app;
pub mod auth;
pub mod markdown;
pub mod services;
mod utils;

use std::sync::Arc;

use folio_axum::AxumApp;
use folio_blob::{BlobStore, BlobStoreRouter, ImageNormalizer};
use folio_core::{FileKeyValueStore, FolioConfig, KeyValueStore};

use crate::auth::{AuthGate, SessionAuthGate};
use crate::markdown::SanitizingRenderer;
use crate::services::FolioState;

pub async fn build() -> anyhow::Result<AxumApp> {
    let config = app::folio_config();
    let snapshot = config.snapshot();

    let data_dir = snapshot
        .get_string("data.dir")
        .unwrap_or_else(|| "data".to_string());
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(data_dir).await?);

    let storage = app::storage_config(&snapshot);
    let blobs = BlobStoreRouter::from_config(storage).await;

    let auth = admin_gate(&config);
    assemble(config, kv, blobs, auth)
}

/// Same as [`build`], with the document store and object store supplied.
pub fn build_with(
    config: FolioConfig,
    kv: Arc<dyn KeyValueStore>,
    object_store: Option<Arc<dyn BlobStore>>,
) -> anyhow::Result<AxumApp> {
    let auth = admin_gate(&config);
    build_with_gate(config, kv, object_store, auth)
}

/// [`build_with`] around a caller-owned gate, e.g. a [`SessionAuthGate`]
/// the embedding application opens sessions on.
pub fn build_with_gate(
    config: FolioConfig,
    kv: Arc<dyn KeyValueStore>,
    object_store: Option<Arc<dyn BlobStore>>,
    auth: Arc<dyn AuthGate>,
) -> anyhow::Result<AxumApp> {
    let storage = app::storage_config(&config.snapshot());
    let blobs = BlobStoreRouter::new(storage, object_store);
    assemble(config, kv, blobs, auth)
}

fn admin_gate(config: &FolioConfig) -> Arc<dyn AuthGate> {
    Arc::new(SessionAuthGate::new(config.snapshot().get_string("auth.admin_token")))
}

fn assemble(
    config: FolioConfig,
    kv: Arc<dyn KeyValueStore>,
    blobs: BlobStoreRouter,
    auth: Arc<dyn AuthGate>,
) -> anyhow::Result<AxumApp> {
    let snapshot = config.snapshot();

    let normalizer = ImageNormalizer::new(blobs.config().max_image_dimension);
    tracing::info!(
        pipeline = normalizer.pipeline_name(),
        object_storage = blobs.object_store().is_some(),
        upload_dir = %blobs.config().upload_dir.display(),
        "storage ready"
    );

    let state = FolioState {
        config: snapshot.clone(),
        kv,
        blobs,
        normalizer,
        auth,
        renderer: Arc::new(SanitizingRenderer::new()),
    };

    let svcs = services::configure(&state);
    let routes = services::routes(&state, svcs);

    let ax = folio_axum::axum(snapshot)
        .use_router("/", routes)
        .service("/health", || async { "ok" });

    Ok(ax)
}
