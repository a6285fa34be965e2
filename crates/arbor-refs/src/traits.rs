//! The [`RootRef`] trait defining the root pointer interface.

use arbor_types::ObjectId;

use crate::error::Result;

/// An atomically swappable pointer to the current root tree.
///
/// Implementations must be thread-safe and linearizable: every successful
/// [`compare_and_swap`](Self::compare_and_swap) happens at a single instant,
/// and [`load`](Self::load) returns a value some swap (or the initial store)
/// actually wrote.
pub trait RootRef: Send + Sync {
    /// Read the current root id.
    fn load(&self) -> Result<ObjectId>;

    /// Replace `expected` with `new`.
    ///
    /// Fails with [`RefError::Conflict`](crate::RefError::Conflict) carrying
    /// the current value if the reference no longer equals `expected`; the
    /// reference is left unchanged in that case.
    fn compare_and_swap(&self, expected: &ObjectId, new: &ObjectId) -> Result<()>;
}
