use serde::{Deserialize, Serialize};

use arbor_crypto::ContentHasher;
use arbor_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// The kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw file contents.
    Blob,
    /// Directory listing.
    Tree,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }

    /// Parse the tag written by [`ObjectKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            _ => None,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored object: kind tag + serialized payload + cached size.
///
/// This is the unit the [`ObjectStore`](crate::ObjectStore) deals in. The
/// store never looks inside `data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    /// Length of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Content-addressed id under this object's kind domain.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    /// Whether `id` is the content address of this object.
    pub fn verify(&self, id: &ObjectId) -> bool {
        self.kind.hasher().verify(&self.data, id)
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// File contents.
///
/// Blobs are values: every edit returns a new `Blob` and leaves the original
/// untouched, which is what lets the namespace rewrite files copy-on-write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// At most `size` bytes starting at `offset`; empty past end-of-file.
    pub fn read_range(&self, offset: usize, size: usize) -> &[u8] {
        if offset >= self.data.len() {
            return &[];
        }
        let end = offset.saturating_add(size).min(self.data.len());
        &self.data[offset..end]
    }

    /// Overwrite `[offset, offset + bytes.len())`, extending the blob when the
    /// range runs past the end. A gap between the old end and `offset` reads
    /// back as zeros. Bytes after the written range are kept. An empty write
    /// changes nothing, even past the end.
    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Blob {
        if bytes.is_empty() {
            return self.clone();
        }
        let end = offset + bytes.len();
        let mut data = self.data.clone();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        Blob { data }
    }

    /// Exactly `len` bytes: cut short, or zero-padded past the old end.
    pub fn truncated(&self, len: usize) -> Blob {
        let mut data = self.data.clone();
        data.resize(len, 0);
        Blob { data }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Blob {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected blob, got {}", obj.kind),
            });
        }
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// What a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    Blob,
    /// A subdirectory.
    Tree,
}

impl EntryKind {
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Blob => ObjectKind::Blob,
            Self::Tree => ObjectKind::Tree,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.object_kind().as_str())
    }
}

/// One named child of a directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub kind: EntryKind,
    pub name: String,
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Why `name` cannot name an entry, or `None` if it can.
    pub fn invalid_name_reason(name: &str) -> Option<&'static str> {
        if name.is_empty() {
            Some("entry name must not be empty")
        } else if name == "." || name == ".." {
            Some("'.' and '..' are reserved")
        } else if name.contains('/') {
            Some("entry name must not contain '/'")
        } else if name.contains('\0') {
            Some("entry name must not contain NUL")
        } else {
            None
        }
    }

    pub fn new(kind: EntryKind, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            kind,
            name: name.into(),
            object_id,
        }
    }

    pub fn blob(name: impl Into<String>, object_id: ObjectId) -> Self {
        Self::new(EntryKind::Blob, name, object_id)
    }

    pub fn tree(name: impl Into<String>, object_id: ObjectId) -> Self {
        Self::new(EntryKind::Tree, name, object_id)
    }
}

/// Directory listing, analogous to a git tree.
///
/// Entries are kept sorted by name with no duplicates, so a given set of
/// children always serializes to the same bytes and hence the same id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from unordered entries. On duplicate names the entry that
    /// comes last in `entries` wins.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::empty(), |tree, entry| tree.with_entry(entry))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.position(name).ok().map(|i| &self.entries[i])
    }

    /// A copy of this tree with `entry` inserted, replacing any entry of the
    /// same name.
    pub fn with_entry(&self, entry: TreeEntry) -> Tree {
        let mut entries = self.entries.clone();
        match self.position(&entry.name) {
            Ok(i) => entries[i] = entry,
            Err(i) => entries.insert(i, entry),
        }
        Tree { entries }
    }

    /// A copy of this tree without the entry called `name`.
    pub fn without(&self, name: &str) -> Tree {
        let mut entries = self.entries.clone();
        if let Ok(i) = self.position(name) {
            entries.remove(i);
        }
        Tree { entries }
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    /// Decode a tree, rejecting payloads whose entries are unsorted, repeat
    /// a name, or carry a name no path could reach.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Tree {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected tree, got {}", obj.kind),
            });
        }
        let tree: Tree = serde_json::from_slice(&obj.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        for entry in &tree.entries {
            if let Some(reason) = TreeEntry::invalid_name_reason(&entry.name) {
                return Err(StoreError::CorruptObject {
                    id: obj.compute_id(),
                    reason: format!("bad entry name {:?}: {reason}", entry.name),
                });
            }
        }
        if let Some(pair) = tree.entries.windows(2).find(|w| w[0].name >= w[1].name) {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!(
                    "entries out of order: {:?} before {:?}",
                    pair[0].name, pair[1].name
                ),
            });
        }
        Ok(tree)
    }
}
