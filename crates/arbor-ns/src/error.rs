use arbor_refs::RefError;
use arbor_store::StoreError;
use arbor_types::ObjectId;
use thiserror::Error;

/// Caller-visible failures of namespace operations.
///
/// Root-swap conflicts are retried inside the engine and never show up here.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("file too large: {path} would be {size} bytes (limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// A tree entry points at an object the store does not have.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<StoreError> for NamespaceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

pub type NamespaceResult<T> = Result<T, NamespaceError>;
