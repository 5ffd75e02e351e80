use std::time::Duration;

use folio_blob::StorageConfig;
use folio_core::{FolioConfig, FolioConfigSnapshot};

pub const ENV_PREFIX: &str = "FOLIO__";

/// Built-in defaults, without environment overrides.
pub fn default_config() -> FolioConfig {
    let mut config = FolioConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3030");
    config.set("data.dir", "data");
    config.set("storage.region", "us-east-1");
    config.set("storage.force_path_style", "true");
    config.set("storage.upload_dir", "uploads");
    config.set("storage.key_prefix", "uploads");
    config.set("storage.presign_expiry_secs", "3600");
    config.set("storage.local_dev_markers", "minio,localhost,127.0.0.1");
    config.set("uploads.max_bytes", "10485760");
    config.set("images.max_dimension", "2048");
    config.set("posts.max_batch_bytes", "5242880");
    config.set("posts.default_hidden", "false");
    config.set("cors.allow_any", "false");
    config
}

/// Defaults overridden by `FOLIO__SECTION__KEY` variables.
pub fn folio_config() -> FolioConfig {
    let mut config = default_config();
    let applied = config.load_env(ENV_PREFIX);
    tracing::debug!(applied, "loaded configuration");
    config
}

pub fn storage_config(cfg: &FolioConfigSnapshot) -> StorageConfig {
    let defaults = StorageConfig::default();

    let mut storage = StorageConfig::new()
        .with_object_storage_parts(
            cfg.get_string("storage.endpoint"),
            cfg.get_string("storage.access_key"),
            cfg.get_string("storage.secret_key"),
            cfg.get_string("storage.bucket"),
        )
        .with_force_path_style(cfg.get_bool("storage.force_path_style").unwrap_or(true))
        .with_public_endpoint(cfg.get_string("storage.public_endpoint"))
        .with_public_base_url(cfg.get_string("storage.public_base_url"))
        .with_upload_dir(
            cfg.get_string("storage.upload_dir")
                .unwrap_or_else(|| "uploads".to_string()),
        )
        .with_key_prefix(
            cfg.get_string("storage.key_prefix")
                .unwrap_or_else(|| "uploads".to_string()),
        )
        .with_presign_expiry(
            cfg.get_u64("storage.presign_expiry_secs")
                .map(Duration::from_secs)
                .unwrap_or(defaults.presign_expiry),
        )
        .with_max_upload_bytes(
            cfg.get_u64("uploads.max_bytes")
                .unwrap_or(defaults.max_upload_bytes),
        )
        .with_max_image_dimension(
            cfg.get_u64("images.max_dimension")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_image_dimension),
        );

    if let Some(region) = cfg.get_string("storage.region") {
        storage = storage.with_region(region);
    }
    if cfg.get("storage.local_dev_markers").is_some() {
        storage = storage.with_local_dev_markers(cfg.get_list("storage.local_dev_markers"));
    }
    storage
}
