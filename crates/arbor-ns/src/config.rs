use std::fs;
use std::path::Path;

use arbor_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NamespaceError, NamespaceResult};

/// Per-repository settings, read from `arbor.toml` in the repository root.
///
/// ```toml
/// max_file_size = 1073741824
///
/// [store]
/// sync_writes = true
/// verify_reads = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Largest file a write or truncate may produce, in bytes.
    pub max_file_size: u64,
    /// Settings for the on-disk object store.
    pub store: StoreConfig,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024,
            store: StoreConfig::default(),
        }
    }
}

impl RepoConfig {
    pub const FILE_NAME: &'static str = "arbor.toml";

    pub fn from_toml(text: &str) -> NamespaceResult<Self> {
        toml::from_str(text).map_err(|e| NamespaceError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> NamespaceResult<String> {
        toml::to_string_pretty(self).map_err(|e| NamespaceError::Config(e.to_string()))
    }

    /// Load `arbor.toml` from `repo_dir`, or the defaults if there is none.
    pub fn load(repo_dir: &Path) -> NamespaceResult<Self> {
        let path = repo_dir.join(Self::FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(path = %path.display(), "loading repository config");
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(NamespaceError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RepoConfig::default();
        assert_eq!(c.max_file_size, 1 << 30);
        assert!(c.store.sync_writes);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RepoConfig::from_toml("[store]\nverify_reads = false\n").unwrap();
        assert_eq!(c.max_file_size, 1 << 30);
        assert!(c.store.sync_writes);
        assert!(!c.store.verify_reads);
    }

    #[test]
    fn toml_roundtrip() {
        let c = RepoConfig {
            max_file_size: 4096,
            store: StoreConfig::fast(),
        };
        assert_eq!(RepoConfig::from_toml(&c.to_toml().unwrap()).unwrap(), c);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = RepoConfig::from_toml("max_file_size = \"lots\"").unwrap_err();
        assert!(matches!(err, NamespaceError::Config(_)));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(RepoConfig::load(dir.path()).unwrap(), RepoConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(RepoConfig::FILE_NAME), "max_file_size = 10\n").unwrap();
        assert_eq!(RepoConfig::load(dir.path()).unwrap().max_file_size, 10);
    }
}
