//! In-memory root reference for testing and embedding.
//!
//! [`InMemoryRootRef`] keeps the root id behind a `RwLock`. Loads share the
//! read lock; a swap takes the write lock just long enough to compare and
//! store.

use std::sync::RwLock;

use arbor_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::traits::RootRef;

/// An in-memory implementation of [`RootRef`]. Lost when dropped.
#[derive(Debug)]
pub struct InMemoryRootRef {
    root: RwLock<ObjectId>,
}

impl InMemoryRootRef {
    /// Create a reference initially pointing at `root`.
    pub fn new(root: ObjectId) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }
}

impl RootRef for InMemoryRootRef {
    fn load(&self) -> Result<ObjectId> {
        let root = self
            .root
            .read()
            .map_err(|e| RefError::Poisoned(e.to_string()))?;
        Ok(*root)
    }

    fn compare_and_swap(&self, expected: &ObjectId, new: &ObjectId) -> Result<()> {
        let mut root = self
            .root
            .write()
            .map_err(|e| RefError::Poisoned(e.to_string()))?;
        if *root != *expected {
            return Err(RefError::Conflict {
                expected: *expected,
                actual: *root,
            });
        }
        debug!(from = %expected.short_hex(), to = %new.short_hex(), "root swapped");
        *root = *new;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn id(n: u8) -> ObjectId {
        ObjectId::from_hash([n; 32])
    }

    #[test]
    fn load_returns_initial_value() {
        let r = InMemoryRootRef::new(id(1));
        assert_eq!(r.load().unwrap(), id(1));
    }

    #[test]
    fn swap_from_expected_succeeds() {
        let r = InMemoryRootRef::new(id(1));
        r.compare_and_swap(&id(1), &id(2)).unwrap();
        assert_eq!(r.load().unwrap(), id(2));
    }

    #[test]
    fn stale_swap_conflicts_and_leaves_value() {
        let r = InMemoryRootRef::new(id(1));
        r.compare_and_swap(&id(1), &id(2)).unwrap();

        let err = r.compare_and_swap(&id(1), &id(3)).unwrap_err();
        assert!(err.is_conflict());
        match err {
            RefError::Conflict { expected, actual } => {
                assert_eq!(expected, id(1));
                assert_eq!(actual, id(2));
            }
            other => panic!("expected Conflict, got: {other}"),
        }
        assert_eq!(r.load().unwrap(), id(2));
    }

    #[test]
    fn racing_swaps_from_same_value_have_one_winner() {
        let r = Arc::new(InMemoryRootRef::new(id(0)));
        let handles: Vec<_> = (1..=8u8)
            .map(|n| {
                let r = Arc::clone(&r);
                thread::spawn(move || r.compare_and_swap(&id(0), &id(n)).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_ne!(r.load().unwrap(), id(0));
    }
}
