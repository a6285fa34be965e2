use arbor_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, ObjectKind, StoredObject, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same content always produces
///   the same id.
/// - Write-then-link: `write` returns only after the object is as durable as
///   the backend can make it, so callers may reference the id immediately.
/// - `write` of content that is already present is a no-op, and concurrent
///   writes of identical content are safe without extra locking.
/// - Concurrent reads are always safe.
pub trait ObjectStore: Send + Sync {
    /// Read an object by id. `Ok(None)` if it does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Store an object if absent and return its id.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Kind and payload length of an object. Backends that can answer
    /// without loading the payload should override this.
    fn header(&self, id: &ObjectId) -> StoreResult<Option<(ObjectKind, u64)>> {
        Ok(self.read(id)?.map(|object| (object.kind, object.size)))
    }

    /// Like [`read`](Self::read), but a missing object is an error.
    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    fn get_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        Blob::from_stored_object(&self.get(id)?)
    }

    fn get_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_stored_object(&self.get(id)?)
    }

    fn put_blob(&self, blob: &Blob) -> StoreResult<ObjectId> {
        self.write(&blob.to_stored_object())
    }

    fn put_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }
}
