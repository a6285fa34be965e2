//! Copy-on-write rewriting of the path from a changed entry up to a new root.
//!
//! [`rewrite`] is one attempt at a mutation against a fixed root: it resolves
//! the parent directory, computes the parent's new listing, and stores a new
//! tree for every ancestor, children before parents. It never touches the
//! root reference; publishing the returned id is the caller's job.

use arbor_store::{Blob, EntryKind, ObjectStore, Tree, TreeEntry};
use arbor_types::ObjectId;

use crate::error::{NamespaceError, NamespaceResult};
use crate::path::{validate_name, NsPath};
use crate::resolve::{resolve_dir, Level};

/// One logical mutation, replayable against any root.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Edit<'a> {
    CreateFile,
    CreateDirectory,
    Write { data: &'a [u8], offset: u64 },
    Truncate { len: u64 },
    Unlink,
    RemoveDir,
}

impl Edit<'_> {
    pub(crate) fn op(&self) -> &'static str {
        match self {
            Self::CreateFile => "create",
            Self::CreateDirectory => "mkdir",
            Self::Write { .. } => "write",
            Self::Truncate { .. } => "truncate",
            Self::Unlink => "unlink",
            Self::RemoveDir => "rmdir",
        }
    }
}

/// The root always exists and is a directory, so file edits see a directory
/// and the rest have no parent to edit.
fn root_edit_error(path: &NsPath, edit: Edit<'_>) -> NamespaceError {
    match edit {
        Edit::Write { .. } | Edit::Truncate { .. } | Edit::Unlink => {
            NamespaceError::IsADirectory(path.to_string())
        }
        Edit::CreateFile | Edit::CreateDirectory | Edit::RemoveDir => NamespaceError::InvalidPath {
            path: path.to_string(),
            reason: format!("cannot {} the root directory", edit.op()),
        },
    }
}

/// Apply `edit` at `path` on top of `root` and return the new root id.
///
/// Returns `root` itself when the edit leaves the parent directory unchanged.
pub(crate) fn rewrite(
    store: &dyn ObjectStore,
    max_file_size: u64,
    root: ObjectId,
    path: &NsPath,
    edit: Edit<'_>,
) -> NamespaceResult<ObjectId> {
    let Some((parents, name)) = path.split_last() else {
        return Err(root_edit_error(path, edit));
    };
    validate_name(name)?;

    let (chain, parent) = resolve_dir(store, root, path, parents.len())?;
    let leaf = LeafEdit {
        store,
        max_file_size,
        path,
        name,
    };
    let new_parent = leaf.apply(&parent.tree, edit)?;
    if new_parent == parent.tree {
        return Ok(root);
    }
    rebuild(store, chain, &new_parent)
}

/// Store `dir` and every ancestor in `chain` with its child entry repointed at
/// the freshly stored child, bottom-up. Returns the new root id.
fn rebuild(
    store: &dyn ObjectStore,
    chain: Vec<(Level, TreeEntry)>,
    dir: &Tree,
) -> NamespaceResult<ObjectId> {
    let mut child = store.put_tree(dir)?;
    for (level, entry) in chain.into_iter().rev() {
        let updated = level.tree.with_entry(TreeEntry::tree(entry.name, child));
        child = store.put_tree(&updated)?;
    }
    Ok(child)
}

/// The change to a single entry of the target's parent directory.
struct LeafEdit<'a> {
    store: &'a dyn ObjectStore,
    max_file_size: u64,
    path: &'a NsPath,
    name: &'a str,
}

impl LeafEdit<'_> {
    fn apply(&self, dir: &Tree, edit: Edit<'_>) -> NamespaceResult<Tree> {
        let existing = dir.get(self.name);
        match edit {
            Edit::CreateFile => {
                self.ensure_absent(existing)?;
                let id = self.store.put_blob(&Blob::empty())?;
                Ok(dir.with_entry(TreeEntry::blob(self.name, id)))
            }
            Edit::CreateDirectory => {
                self.ensure_absent(existing)?;
                let id = self.store.put_tree(&Tree::empty())?;
                Ok(dir.with_entry(TreeEntry::tree(self.name, id)))
            }
            Edit::Write { data, offset } => {
                let current = match existing {
                    None => Blob::empty(),
                    Some(entry) => self.load_file(entry)?,
                };
                if !data.is_empty() {
                    self.checked_len(offset.saturating_add(data.len() as u64))?;
                }
                let updated = current.write_at(self.to_usize(offset)?, data);
                self.put_file(dir, &updated)
            }
            Edit::Truncate { len } => {
                let entry = existing.ok_or_else(|| self.not_found())?;
                let current = self.load_file(entry)?;
                let len = self.checked_len(len)?;
                self.put_file(dir, &current.truncated(len))
            }
            Edit::Unlink => {
                let entry = existing.ok_or_else(|| self.not_found())?;
                if entry.kind == EntryKind::Tree {
                    return Err(NamespaceError::IsADirectory(self.path.to_string()));
                }
                Ok(dir.without(self.name))
            }
            Edit::RemoveDir => {
                let entry = existing.ok_or_else(|| self.not_found())?;
                if entry.kind != EntryKind::Tree {
                    return Err(NamespaceError::NotADirectory(self.path.to_string()));
                }
                if !self.store.get_tree(&entry.object_id)?.is_empty() {
                    return Err(NamespaceError::NotEmpty(self.path.to_string()));
                }
                Ok(dir.without(self.name))
            }
        }
    }

    fn not_found(&self) -> NamespaceError {
        NamespaceError::NotFound(self.path.to_string())
    }

    fn ensure_absent(&self, existing: Option<&TreeEntry>) -> NamespaceResult<()> {
        match existing {
            Some(_) => Err(NamespaceError::AlreadyExists(self.path.to_string())),
            None => Ok(()),
        }
    }

    fn load_file(&self, entry: &TreeEntry) -> NamespaceResult<Blob> {
        if entry.kind == EntryKind::Tree {
            return Err(NamespaceError::IsADirectory(self.path.to_string()));
        }
        Ok(self.store.get_blob(&entry.object_id)?)
    }

    fn put_file(&self, dir: &Tree, blob: &Blob) -> NamespaceResult<Tree> {
        let id = self.store.put_blob(blob)?;
        Ok(dir.with_entry(TreeEntry::blob(self.name, id)))
    }

    /// Enforce the configured file size limit on a resulting length.
    fn checked_len(&self, len: u64) -> NamespaceResult<usize> {
        if len > self.max_file_size {
            return Err(self.too_large(len));
        }
        self.to_usize(len)
    }

    fn to_usize(&self, n: u64) -> NamespaceResult<usize> {
        usize::try_from(n).map_err(|_| self.too_large(n))
    }

    fn too_large(&self, size: u64) -> NamespaceError {
        NamespaceError::FileTooLarge {
            path: self.path.to_string(),
            size,
            limit: self.max_file_size,
        }
    }
}
