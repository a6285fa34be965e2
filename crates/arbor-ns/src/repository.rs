//! On-disk repositories.
//!
//! ```text
//! {repo}/
//! ├── arbor.toml   # optional RepoConfig
//! ├── ROOT         # hex id of the current root tree
//! ├── ROOT.lock    # held while swapping ROOT
//! └── objects/     # FileObjectStore
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arbor_refs::{FileRootRef, RootRef};
use arbor_store::{FileObjectStore, ObjectStore, StoreError, Tree};
use tracing::info;

use crate::config::RepoConfig;
use crate::error::{NamespaceError, NamespaceResult};
use crate::namespace::Namespace;

const ROOT_FILE: &str = "ROOT";

impl Namespace {
    /// Create a repository with an empty root directory in `dir`.
    ///
    /// Writes a default `arbor.toml` unless one is already there, so settings
    /// can be placed before init.
    pub fn init_dir(dir: impl AsRef<Path>) -> NamespaceResult<Self> {
        let dir = dir.as_ref();
        let root_path = dir.join(ROOT_FILE);
        if root_path.exists() {
            return Err(NamespaceError::AlreadyExists(dir.display().to_string()));
        }
        fs::create_dir_all(dir).map_err(StoreError::from)?;

        let config_path = dir.join(RepoConfig::FILE_NAME);
        if !config_path.exists() {
            fs::write(&config_path, RepoConfig::default().to_toml()?)
                .map_err(StoreError::from)?;
        }
        let config = RepoConfig::load(dir)?;

        let store = FileObjectStore::open(dir, config.store.clone())?;
        let empty = store.put_tree(&Tree::empty())?;
        let root = FileRootRef::create(root_path, &empty)?;
        info!(path = %dir.display(), root = %empty.short_hex(), "initialized repository");

        Ok(Self::new(Arc::new(store), Arc::new(root), config))
    }

    /// Open the repository in `dir`.
    pub fn open_dir(dir: impl AsRef<Path>) -> NamespaceResult<Self> {
        let dir = dir.as_ref();
        let config = RepoConfig::load(dir)?;
        let root = FileRootRef::open(dir.join(ROOT_FILE))?;
        let store = FileObjectStore::open(dir, config.store.clone())?;

        let current = root.load()?;
        if !store.exists(&current)? {
            return Err(NamespaceError::ObjectNotFound(current));
        }
        info!(path = %dir.display(), root = %current.short_hex(), "opened repository");

        Ok(Self::new(Arc::new(store), Arc::new(root), config))
    }
}
