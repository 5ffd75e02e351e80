//! # Configuration
//!
//! Folio configuration is a flat string key/value store with dotted keys
//! (`storage.bucket`, `http.port`). Defaults are set in code, then
//! environment variables with a prefix override them:
//!
//! ```rust
//! use folio_core::FolioConfig;
//!
//! let mut config = FolioConfig::new();
//! config.set("http.port", "3030");
//! config.set("storage.force_path_style", "true");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_usize("http.port"), Some(3030));
//! assert_eq!(snapshot.get_bool("storage.force_path_style"), Some(true));
//! ```
//!
//! `FOLIO__STORAGE__BUCKET=media` becomes `storage.bucket = media` when
//! loaded with `load_env("FOLIO__")`.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FolioConfig {
    values: HashMap<String, String>,
}

impl FolioConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Apply environment overrides: `PREFIX` + `SECTION__NAME` → `section.name`.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    /// Same as `load_env`, over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                tracing::debug!(key = %normalized, "config override from environment");
                self.values.insert(normalized, value);
                applied += 1;
            }
        }
        applied
    }

    pub fn snapshot(&self) -> FolioConfigSnapshot {
        FolioConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable copy of the configuration handed to services.
#[derive(Debug, Clone, Default)]
pub struct FolioConfigSnapshot {
    map: HashMap<String, String>,
}

impl FolioConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    /// Non-blank value, trimmed.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Accepts `true/false`, `1/0`, `yes/no`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    }

    /// Comma separated list, blanks dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_map_to_dotted_keys() {
        let mut config = FolioConfig::new();
        let applied = config.load_vars(
            "FOLIO__",
            vec![
                ("FOLIO__STORAGE__BUCKET".to_string(), "media".to_string()),
                ("FOLIO__HTTP__PORT".to_string(), "8080".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
        );

        assert_eq!(applied, 2);
        assert_eq!(config.get("storage.bucket"), Some("media"));
        assert_eq!(config.get("http.port"), Some("8080"));
        assert_eq!(config.get("path"), None);
    }

    #[test]
    fn snapshot_parsers() {
        let mut config = FolioConfig::new();
        config.set("a", " yes ");
        config.set("b", "minio, localhost,,127.0.0.1");
        config.set("c", "   ");
        let snap = config.snapshot();

        assert_eq!(snap.get_bool("a"), Some(true));
        assert_eq!(snap.get_list("b"), vec!["minio", "localhost", "127.0.0.1"]);
        assert_eq!(snap.get_string("c"), None);
        assert_eq!(snap.get_u64("missing"), None);
    }
}
