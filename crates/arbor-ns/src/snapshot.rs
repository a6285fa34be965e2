use std::sync::Arc;

use arbor_store::{EntryKind, ObjectKind, ObjectStore, StoreError};
use arbor_types::ObjectId;

use crate::error::{NamespaceError, NamespaceResult};
use crate::path::NsPath;
use crate::resolve::{self, Node, ResolvedPath};

/// Attributes of a resolved path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    /// Byte length for files, zero for directories.
    pub size: u64,
    pub object_id: ObjectId,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind.is_tree()
    }
}

/// A read-only view of the namespace pinned to one root tree.
///
/// Everything reachable from a root id is immutable, so a snapshot stays
/// consistent no matter what writers commit after it was taken.
#[derive(Clone)]
pub struct Snapshot {
    store: Arc<dyn ObjectStore>,
    root: ObjectId,
}

impl Snapshot {
    pub fn new(store: Arc<dyn ObjectStore>, root: ObjectId) -> Self {
        Self { store, root }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn resolve(&self, path: &str) -> NamespaceResult<ResolvedPath> {
        resolve::resolve(self.store.as_ref(), self.root, &NsPath::parse(path))
    }

    /// Kind, size and id of the object at `path`. Only directories above
    /// the target are decoded; a file's size comes from its object header.
    pub fn stat(&self, path: &str) -> NamespaceResult<Metadata> {
        let parsed = NsPath::parse(path);
        let Some((parents, name)) = parsed.split_last() else {
            let target = self.resolve(path)?.target;
            return Ok(Metadata {
                kind: target.kind(),
                size: target.size(),
                object_id: target.id(),
            });
        };

        let store = self.store.as_ref();
        let (_, parent) = resolve::resolve_dir(store, self.root, &parsed, parents.len())?;
        let entry = parent
            .tree
            .get(name)
            .ok_or_else(|| NamespaceError::NotFound(parsed.to_string()))?;

        let size = match entry.kind {
            EntryKind::Tree => 0,
            EntryKind::Blob => match store.header(&entry.object_id)? {
                Some((ObjectKind::Blob, size)) => size,
                Some((other, _)) => {
                    return Err(StoreError::CorruptObject {
                        id: entry.object_id,
                        reason: format!("expected blob, got {other}"),
                    }
                    .into())
                }
                None => return Err(NamespaceError::ObjectNotFound(entry.object_id)),
            },
        };
        Ok(Metadata {
            kind: entry.kind,
            size,
            object_id: entry.object_id,
        })
    }

    /// Entry names of the directory at `path`, in sorted order.
    pub fn list_entries(&self, path: &str) -> NamespaceResult<Vec<String>> {
        match self.resolve(path)?.target {
            Node::Tree { tree, .. } => Ok(tree.names()),
            Node::Blob { .. } => Err(NamespaceError::NotADirectory(
                NsPath::parse(path).to_string(),
            )),
        }
    }

    /// At most `size` bytes of the file at `path` starting at `offset`.
    /// Reading at or past end-of-file returns no bytes.
    pub fn read_range(&self, path: &str, offset: u64, size: u64) -> NamespaceResult<Vec<u8>> {
        match self.resolve(path)?.target {
            Node::Blob { blob, .. } => {
                let Ok(offset) = usize::try_from(offset) else {
                    return Ok(Vec::new());
                };
                let size = usize::try_from(size).unwrap_or(usize::MAX);
                Ok(blob.read_range(offset, size).to_vec())
            }
            Node::Tree { .. } => Err(NamespaceError::IsADirectory(
                NsPath::parse(path).to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("root", &self.root)
            .finish()
    }
}
