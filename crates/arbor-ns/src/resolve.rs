//! Path resolution against an immutable root tree.
//!
//! Resolution walks one tree per path component, looking each name up in the
//! current tree. Only the final object is loaded when it is a blob; a blob met
//! with components still left to walk is reported as `NotADirectory` without
//! being read.

use arbor_store::{Blob, EntryKind, ObjectStore, Tree, TreeEntry};
use arbor_types::ObjectId;

use crate::error::{NamespaceError, NamespaceResult};
use crate::path::NsPath;

/// A directory met on the walk, with the id it was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    pub id: ObjectId,
    pub tree: Tree,
}

/// The object a path resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Blob { id: ObjectId, blob: Blob },
    Tree { id: ObjectId, tree: Tree },
}

impl Node {
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Blob { id, .. } | Self::Tree { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Blob { .. } => EntryKind::Blob,
            Self::Tree { .. } => EntryKind::Tree,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Tree { .. })
    }

    /// Byte length for files, zero for directories.
    pub fn size(&self) -> u64 {
        match self {
            Self::Blob { blob, .. } => blob.len() as u64,
            Self::Tree { .. } => 0,
        }
    }
}

/// Result of resolving a path from a given root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Root tree id the walk started from.
    pub root: ObjectId,
    /// Each directory from the root down to the target's parent, paired with
    /// the entry followed out of it. Empty when the target is the root.
    pub chain: Vec<(Level, TreeEntry)>,
    pub target: Node,
}

impl ResolvedPath {
    /// The directory holding the target; `None` for the root.
    pub fn parent(&self) -> Option<&Level> {
        self.chain.last().map(|(level, _)| level)
    }

    /// The entry naming the target in its parent; `None` for the root.
    pub fn entry(&self) -> Option<&TreeEntry> {
        self.chain.last().map(|(_, entry)| entry)
    }
}

/// Walk `path` down from `root`, requiring every component to be a directory.
///
/// Returns the chain of directories above the last one (each with the entry
/// followed out of it) and the last directory itself. `depth` limits how many
/// components of `path` are walked.
pub(crate) fn resolve_dir(
    store: &dyn ObjectStore,
    root: ObjectId,
    path: &NsPath,
    depth: usize,
) -> NamespaceResult<(Vec<(Level, TreeEntry)>, Level)> {
    let mut chain = Vec::with_capacity(depth);
    let mut current = Level {
        id: root,
        tree: store.get_tree(&root)?,
    };

    for (i, name) in path.components()[..depth].iter().enumerate() {
        let shown = path.display_prefix(i + 1);
        let entry = current
            .tree
            .get(name)
            .cloned()
            .ok_or_else(|| NamespaceError::NotFound(shown.clone()))?;
        if entry.kind != EntryKind::Tree {
            return Err(NamespaceError::NotADirectory(shown));
        }
        let next = Level {
            id: entry.object_id,
            tree: store.get_tree(&entry.object_id)?,
        };
        chain.push((current, entry));
        current = next;
    }

    Ok((chain, current))
}

/// Resolve `path` from `root` to the object it names.
pub fn resolve(
    store: &dyn ObjectStore,
    root: ObjectId,
    path: &NsPath,
) -> NamespaceResult<ResolvedPath> {
    let Some((parents, name)) = path.split_last() else {
        return Ok(ResolvedPath {
            root,
            chain: Vec::new(),
            target: Node::Tree {
                id: root,
                tree: store.get_tree(&root)?,
            },
        });
    };

    let (mut chain, parent) = resolve_dir(store, root, path, parents.len())?;
    let entry = parent
        .tree
        .get(name)
        .cloned()
        .ok_or_else(|| NamespaceError::NotFound(path.to_string()))?;

    let target = match entry.kind {
        EntryKind::Blob => Node::Blob {
            id: entry.object_id,
            blob: store.get_blob(&entry.object_id)?,
        },
        EntryKind::Tree => Node::Tree {
            id: entry.object_id,
            tree: store.get_tree(&entry.object_id)?,
        },
    };
    chain.push((parent, entry));

    Ok(ResolvedPath {
        root,
        chain,
        target,
    })
}
