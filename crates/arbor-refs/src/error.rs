//! Error types for root reference operations.

use arbor_types::{ObjectId, TypeError};
use thiserror::Error;

/// Errors that can occur while reading or swapping the root reference.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference no longer holds the value the swap expected.
    ///
    /// Callers running an optimistic update loop should re-read and retry.
    #[error("root moved: expected {expected}, found {actual}")]
    Conflict { expected: ObjectId, actual: ObjectId },

    /// The reference file does not exist.
    #[error("root reference not initialized")]
    Uninitialized,

    /// A reference with this location already exists.
    #[error("root reference already exists")]
    AlreadyExists,

    /// The stored reference could not be parsed.
    #[error("corrupt root reference: {0}")]
    Corrupt(#[from] TypeError),

    /// A lock guarding the reference was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
