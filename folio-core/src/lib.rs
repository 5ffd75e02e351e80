//! folio-core: errors, configuration and document storage shared by the
//! Folio crates.

pub mod config;
pub mod errors;
pub mod kv;

pub use config::{FolioConfig, FolioConfigSnapshot};
pub use errors::{ErrorKind, FolioError, FolioResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
