use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Where a blob lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Backend {
    Local,
    ObjectStorage,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "LOCAL",
            Backend::ObjectStorage => "OBJECT_STORAGE",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful blob write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDescriptor {
    pub backend: Backend,
    /// Object key (`uploads/<name>`) or path relative to the upload dir (`<name>`).
    pub storage_key: String,
    pub size: u64,
}

impl StorageDescriptor {
    /// Public file name, shared by both backends.
    pub fn file_name(&self) -> &str {
        basename(&self.storage_key)
    }
}

/// Last path segment of a storage key.
pub fn basename(key: &str) -> &str {
    key.rsplit(['/', '\\']).next().unwrap_or(key)
}

const MAX_NAME_LEN: usize = 255;

/// Names accepted on the read path: one segment, no traversal, no hidden files.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Clean a client supplied file name for display.
///
/// Directory components are dropped, `..` sequences and control characters
/// removed, anything outside a conservative set replaced by `_`.
pub fn sanitize_filename(raw: &str) -> String {
    let last = basename(raw.trim());
    let cleaned: String = last
        .replace("..", "")
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        return "upload".to_string();
    }

    let mut out = cleaned.to_string();
    if out.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }
    out
}

/// Lower-cased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let base = basename(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\photo.png"), "photo.png");
        assert_eq!(sanitize_filename("..png"), "png");
        assert_eq!(sanitize_filename("a<b>.jpg"), "a_b_.jpg");
        assert_eq!(sanitize_filename("   "), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn safe_names() {
        assert!(is_safe_name("1700000000000-abc123.png"));
        assert!(!is_safe_name("../secret"));
        assert!(!is_safe_name("a/b.png"));
        assert!(!is_safe_name(".env"));
        assert!(!is_safe_name(""));
    }

    #[test]
    fn descriptor_file_name() {
        let d = StorageDescriptor {
            backend: Backend::ObjectStorage,
            storage_key: "uploads/1-x.png".into(),
            size: 4,
        };
        assert_eq!(d.file_name(), "1-x.png");
        assert_eq!(extension_of("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of(".hidden"), None);
    }

    #[test]
    fn backend_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&Backend::ObjectStorage).unwrap(),
            "\"OBJECT_STORAGE\""
        );
    }
}
