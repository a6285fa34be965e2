use std::sync::Arc;

use arbor_refs::{InMemoryRootRef, RefError, RootRef};
use arbor_store::{InMemoryObjectStore, ObjectStore, Tree};
use arbor_types::ObjectId;
use tracing::debug;

use crate::config::RepoConfig;
use crate::error::NamespaceResult;
use crate::path::NsPath;
use crate::preview::Preview;
use crate::resolve::ResolvedPath;
use crate::snapshot::{Metadata, Snapshot};
use crate::update::{self, Edit};

/// A mutable filesystem namespace over an object store and a root reference.
///
/// `Namespace` is cheap to share between threads (`Arc` it); every method
/// takes `&self`. Reads pin one root via [`Namespace::snapshot`]; writes run
/// an optimistic loop of rewrite then compare-and-swap until they land.
pub struct Namespace {
    store: Arc<dyn ObjectStore>,
    root: Arc<dyn RootRef>,
    config: RepoConfig,
}

impl Namespace {
    /// Assemble a namespace from parts. `root` must already name a tree
    /// stored in `store`.
    pub fn new(store: Arc<dyn ObjectStore>, root: Arc<dyn RootRef>, config: RepoConfig) -> Self {
        Self {
            store,
            root,
            config,
        }
    }

    /// An empty namespace held entirely in memory.
    pub fn in_memory() -> NamespaceResult<Self> {
        Self::in_memory_with(RepoConfig::default())
    }

    pub fn in_memory_with(config: RepoConfig) -> NamespaceResult<Self> {
        let store = Arc::new(InMemoryObjectStore::new());
        let empty = store.put_tree(&Tree::empty())?;
        Ok(Self::new(
            store,
            Arc::new(InMemoryRootRef::new(empty)),
            config,
        ))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// The current root tree id.
    pub fn root_id(&self) -> NamespaceResult<ObjectId> {
        Ok(self.root.load()?)
    }

    /// A read-only view pinned to the current root.
    pub fn snapshot(&self) -> NamespaceResult<Snapshot> {
        Ok(Snapshot::new(Arc::clone(&self.store), self.root_id()?))
    }

    // ---- Reads ----

    pub fn resolve(&self, path: &str) -> NamespaceResult<ResolvedPath> {
        debug!(path, "resolve");
        self.snapshot()?.resolve(path)
    }

    pub fn stat(&self, path: &str) -> NamespaceResult<Metadata> {
        let meta = self.snapshot()?.stat(path);
        debug!(path, ?meta, "stat");
        meta
    }

    pub fn list_entries(&self, path: &str) -> NamespaceResult<Vec<String>> {
        let names = self.snapshot()?.list_entries(path);
        debug!(path, count = names.as_ref().map_or(0, Vec::len), "list_entries");
        names
    }

    pub fn read_range(&self, path: &str, offset: u64, size: u64) -> NamespaceResult<Vec<u8>> {
        let data = self.snapshot()?.read_range(path, offset, size)?;
        debug!(path, offset, size, data = %Preview(&data), "read_range");
        Ok(data)
    }

    // ---- Mutations ----

    pub fn create_file(&self, path: &str) -> NamespaceResult<()> {
        self.commit(path, Edit::CreateFile)
    }

    pub fn create_directory(&self, path: &str) -> NamespaceResult<()> {
        self.commit(path, Edit::CreateDirectory)
    }

    /// Write `data` at `offset`, creating the file if it does not exist.
    /// Returns the number of bytes written, which is always `data.len()`.
    pub fn write_data(&self, path: &str, data: &[u8], offset: u64) -> NamespaceResult<usize> {
        debug!(path, offset, data = %Preview(data), "write_data");
        self.commit(path, Edit::Write { data, offset })?;
        Ok(data.len())
    }

    pub fn truncate(&self, path: &str, len: u64) -> NamespaceResult<()> {
        self.commit(path, Edit::Truncate { len })
    }

    pub fn unlink(&self, path: &str) -> NamespaceResult<()> {
        self.commit(path, Edit::Unlink)
    }

    pub fn rmdir(&self, path: &str) -> NamespaceResult<()> {
        self.commit(path, Edit::RemoveDir)
    }

    /// Apply `edit` against the latest root and publish the result, replaying
    /// it for as long as other writers keep moving the root underneath.
    fn commit(&self, path: &str, edit: Edit<'_>) -> NamespaceResult<()> {
        let parsed = NsPath::parse(path);
        let mut attempt = 1u32;
        loop {
            let old = self.root.load()?;
            let new = update::rewrite(
                self.store.as_ref(),
                self.config.max_file_size,
                old,
                &parsed,
                edit,
            )?;
            if new == old {
                debug!(op = edit.op(), path = %parsed, "no change");
                return Ok(());
            }
            match self.root.compare_and_swap(&old, &new) {
                Ok(()) => {
                    debug!(op = edit.op(), path = %parsed, root = %new.short_hex(), attempt, "committed");
                    return Ok(());
                }
                Err(RefError::Conflict { actual, .. }) => {
                    debug!(
                        op = edit.op(),
                        path = %parsed,
                        attempt,
                        current = %actual.short_hex(),
                        "root moved, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NamespaceError;
    use arbor_store::{EntryKind, StoreError, StoreResult, StoredObject};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    fn ns() -> Namespace {
        Namespace::in_memory().unwrap()
    }

    #[test]
    fn hello_scenario() {
        let ns = ns();
        ns.create_directory("/a").unwrap();
        ns.create_file("/a/b.txt").unwrap();
        assert_eq!(ns.write_data("/a/b.txt", b"hello", 0).unwrap(), 5);
        assert_eq!(ns.read_range("/a/b.txt", 0, 5).unwrap(), b"hello");
        assert_eq!(ns.list_entries("/a").unwrap(), vec!["b.txt"]);

        ns.write_data("/a/b.txt", b"!!", 5).unwrap();
        assert_eq!(ns.read_range("/a/b.txt", 0, 100).unwrap(), b"hello!!");

        ns.truncate("/a/b.txt", 3).unwrap();
        assert_eq!(ns.read_range("/a/b.txt", 0, 100).unwrap(), b"hel");

        ns.create_file("/a/keep").unwrap();
        assert!(matches!(
            ns.rmdir("/a").unwrap_err(),
            NamespaceError::NotEmpty(p) if p == "/a"
        ));

        ns.unlink("/a/b.txt").unwrap();
        ns.unlink("/a/keep").unwrap();
        assert!(matches!(
            ns.resolve("/a/b.txt").unwrap_err(),
            NamespaceError::NotFound(_)
        ));
        ns.rmdir("/a").unwrap();
        assert!(ns.list_entries("/").unwrap().is_empty());
    }

    #[test]
    fn stat_reports_kind_and_size() {
        let ns = ns();
        ns.create_directory("/d").unwrap();
        ns.write_data("/d/f", b"12345", 0).unwrap();

        let file = ns.stat("/d/f").unwrap();
        assert_eq!(file.kind, EntryKind::Blob);
        assert_eq!(file.size, 5);
        let dir = ns.stat("/d").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
    }

    #[test]
    fn create_errors() {
        let ns = ns();
        ns.create_file("/f").unwrap();
        assert!(matches!(
            ns.create_file("/f").unwrap_err(),
            NamespaceError::AlreadyExists(_)
        ));
        assert!(matches!(
            ns.create_directory("/f").unwrap_err(),
            NamespaceError::AlreadyExists(_)
        ));
        assert!(matches!(
            ns.create_file("/missing/g").unwrap_err(),
            NamespaceError::NotFound(p) if p == "/missing"
        ));
        assert!(matches!(
            ns.create_file("/f/g").unwrap_err(),
            NamespaceError::NotADirectory(p) if p == "/f"
        ));
        assert!(matches!(
            ns.create_directory("/").unwrap_err(),
            NamespaceError::InvalidPath { .. }
        ));
    }

    #[test]
    fn kind_mismatch_errors() {
        let ns = ns();
        ns.create_directory("/d").unwrap();
        ns.create_file("/f").unwrap();

        assert!(matches!(ns.unlink("/d").unwrap_err(), NamespaceError::IsADirectory(_)));
        assert!(matches!(ns.rmdir("/f").unwrap_err(), NamespaceError::NotADirectory(_)));
        assert!(matches!(
            ns.read_range("/d", 0, 1).unwrap_err(),
            NamespaceError::IsADirectory(_)
        ));
        assert!(matches!(
            ns.write_data("/d", b"x", 0).unwrap_err(),
            NamespaceError::IsADirectory(_)
        ));
        assert!(matches!(ns.truncate("/d", 0).unwrap_err(), NamespaceError::IsADirectory(_)));
        assert!(matches!(
            ns.list_entries("/f").unwrap_err(),
            NamespaceError::NotADirectory(_)
        ));
    }

    #[test]
    fn file_edits_on_root_see_a_directory() {
        let ns = ns();
        let before = ns.root_id().unwrap();
        assert!(matches!(ns.write_data("/", b"x", 0).unwrap_err(), NamespaceError::IsADirectory(_)));
        assert!(matches!(ns.truncate("/", 0).unwrap_err(), NamespaceError::IsADirectory(_)));
        assert!(matches!(ns.unlink("/").unwrap_err(), NamespaceError::IsADirectory(_)));
        assert!(matches!(ns.rmdir("/").unwrap_err(), NamespaceError::InvalidPath { .. }));
        assert_eq!(ns.root_id().unwrap(), before);
    }

    #[test]
    fn missing_targets_are_not_found() {
        let ns = ns();
        for result in [ns.unlink("/x"), ns.rmdir("/x"), ns.truncate("/x", 1)] {
            assert!(matches!(result.unwrap_err(), NamespaceError::NotFound(p) if p == "/x"));
        }
    }

    #[test]
    fn write_creates_missing_file() {
        let ns = ns();
        ns.write_data("/new", b"abc", 2).unwrap();
        assert_eq!(ns.read_range("/new", 0, 10).unwrap(), b"\0\0abc");
    }

    #[test]
    fn truncate_zero_pads() {
        let ns = ns();
        ns.write_data("/f", b"ab", 0).unwrap();
        ns.truncate("/f", 5).unwrap();
        assert_eq!(ns.read_range("/f", 0, 10).unwrap(), b"ab\0\0\0");
    }

    #[test]
    fn write_beyond_limit_is_rejected() {
        let ns = Namespace::in_memory_with(RepoConfig {
            max_file_size: 8,
            ..RepoConfig::default()
        })
        .unwrap();
        ns.write_data("/f", b"12345678", 0).unwrap();
        assert!(matches!(
            ns.write_data("/f", b"9", 8).unwrap_err(),
            NamespaceError::FileTooLarge { size: 9, limit: 8, .. }
        ));
        assert!(matches!(
            ns.write_data("/f", b"9", u64::MAX).unwrap_err(),
            NamespaceError::FileTooLarge { .. }
        ));
        assert_eq!(ns.stat("/f").unwrap().size, 8);
    }

    #[test]
    fn noop_write_keeps_root() {
        let ns = ns();
        ns.write_data("/f", b"same", 0).unwrap();
        let before = ns.root_id().unwrap();
        ns.write_data("/f", b"am", 1).unwrap();
        ns.write_data("/f", b"", 0).unwrap();
        assert_eq!(ns.root_id().unwrap(), before);
    }

    #[test]
    fn sibling_object_ids_are_untouched() {
        let ns = ns();
        ns.write_data("/a", b"alpha", 0).unwrap();
        ns.write_data("/b", b"beta", 0).unwrap();
        let b_before = ns.stat("/b").unwrap().object_id;

        ns.write_data("/a", b"ALPHA", 0).unwrap();
        assert_eq!(ns.stat("/b").unwrap().object_id, b_before);
        assert_ne!(ns.stat("/a").unwrap().object_id, b_before);
    }

    #[test]
    fn identical_contents_share_one_object() {
        let ns = ns();
        ns.write_data("/one", b"shared bytes", 0).unwrap();
        ns.create_directory("/d").unwrap();
        ns.write_data("/d/two", b"shared bytes", 0).unwrap();
        assert_eq!(
            ns.stat("/one").unwrap().object_id,
            ns.stat("/d/two").unwrap().object_id
        );
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let ns = ns();
        ns.write_data("/f", b"v1", 0).unwrap();
        let snap = ns.snapshot().unwrap();

        ns.write_data("/f", b"v2", 0).unwrap();
        ns.create_file("/g").unwrap();

        assert_eq!(snap.read_range("/f", 0, 2).unwrap(), b"v1");
        assert_eq!(snap.list_entries("/").unwrap(), vec!["f"]);
        assert_eq!(ns.read_range("/f", 0, 2).unwrap(), b"v2");
    }

    #[test]
    fn concurrent_creates_with_distinct_names_all_land() {
        let ns = Arc::new(ns());
        ns.create_directory("/dir").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ns = Arc::clone(&ns);
                thread::spawn(move || {
                    for i in 0..10 {
                        ns.create_file(&format!("/dir/t{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let names = ns.list_entries("/dir").unwrap();
        assert_eq!(names.len(), 80);
        assert!(names.contains(&"t3-7".to_string()));
    }

    #[test]
    fn concurrent_creates_with_same_name_have_one_winner() {
        let ns = Arc::new(ns());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ns = Arc::clone(&ns);
                thread::spawn(move || ns.create_file("/contested"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for r in results.iter().filter(|r| r.is_err()) {
            assert!(matches!(r, Err(NamespaceError::AlreadyExists(_))));
        }
    }

    #[test]
    fn concurrent_writes_to_different_files_keep_both() {
        let ns = Arc::new(ns());
        ns.create_file("/x").unwrap();
        ns.create_file("/y").unwrap();
        let handles: Vec<_> = ["/x", "/y"]
            .into_iter()
            .map(|path| {
                let ns = Arc::clone(&ns);
                thread::spawn(move || {
                    for i in 0..50u64 {
                        ns.write_data(path, &[i as u8], i).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let expected: Vec<u8> = (0..50).collect();
        assert_eq!(ns.read_range("/x", 0, 50).unwrap(), expected);
        assert_eq!(ns.read_range("/y", 0, 50).unwrap(), expected);
    }

    /// Lets a competing writer sneak in once, right before the first swap.
    struct Interfering {
        inner: InMemoryRootRef,
        fired: AtomicBool,
        competitor: ObjectId,
        swaps: AtomicUsize,
    }

    impl RootRef for Interfering {
        fn load(&self) -> arbor_refs::Result<ObjectId> {
            self.inner.load()
        }

        fn compare_and_swap(&self, expected: &ObjectId, new: &ObjectId) -> arbor_refs::Result<()> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner.compare_and_swap(expected, &self.competitor)?;
            }
            self.inner.compare_and_swap(expected, new)
        }
    }

    #[test]
    fn conflicting_swap_is_retried_on_the_new_root() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let empty = store.put_tree(&Tree::empty()).unwrap();

        // The competitor's root already holds a file called "theirs".
        let blob = store.put_blob(&arbor_store::Blob::new(b"t".to_vec())).unwrap();
        let competitor = store
            .put_tree(&Tree::new(vec![arbor_store::TreeEntry::blob("theirs", blob)]))
            .unwrap();

        let root = Arc::new(Interfering {
            inner: InMemoryRootRef::new(empty),
            fired: AtomicBool::new(false),
            competitor,
            swaps: AtomicUsize::new(0),
        });
        let ns = Namespace::new(store, root.clone(), RepoConfig::default());

        ns.create_file("/mine").unwrap();
        assert_eq!(root.swaps.load(Ordering::SeqCst), 2);
        assert_eq!(ns.list_entries("/").unwrap(), vec!["mine", "theirs"]);
    }

    /// Fails every tree write once `armed` is set.
    struct FailingStore {
        inner: InMemoryObjectStore,
        armed: AtomicBool,
    }

    impl ObjectStore for FailingStore {
        fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
            self.inner.read(id)
        }

        fn write(&self, obj: &StoredObject) -> StoreResult<ObjectId> {
            if self.armed.load(Ordering::SeqCst) && obj.kind == arbor_store::ObjectKind::Tree {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.write(obj)
        }

        fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
            self.inner.exists(id)
        }
    }

    #[test]
    fn store_failure_mid_chain_leaves_root_alone() {
        let store = Arc::new(FailingStore {
            inner: InMemoryObjectStore::new(),
            armed: AtomicBool::new(false),
        });
        let empty = store.put_tree(&Tree::empty()).unwrap();
        let ns = Namespace::new(
            store.clone(),
            Arc::new(InMemoryRootRef::new(empty)),
            RepoConfig::default(),
        );
        ns.create_directory("/d").unwrap();
        let before = ns.root_id().unwrap();

        store.armed.store(true, Ordering::SeqCst);
        let err = ns.write_data("/d/f", b"data", 0).unwrap_err();
        assert!(matches!(err, NamespaceError::Store(StoreError::Io(_))));
        assert_eq!(ns.root_id().unwrap(), before);
        assert!(matches!(ns.stat("/d/f").unwrap_err(), NamespaceError::NotFound(_)));
    }

    proptest! {
        #[test]
        fn write_then_read_back(
            base in proptest::collection::vec(any::<u8>(), 0..64),
            data in proptest::collection::vec(any::<u8>(), 1..32),
            offset in 0u64..96,
        ) {
            let ns = ns();
            ns.write_data("/f", &base, 0).unwrap();
            ns.write_data("/f", &data, offset).unwrap();

            let read = ns.read_range("/f", offset, data.len() as u64).unwrap();
            prop_assert_eq!(&read, &data);

            let all = ns.read_range("/f", 0, u64::MAX).unwrap();
            let off = offset as usize;
            for (i, byte) in all.iter().enumerate() {
                if i < off || i >= off + data.len() {
                    let old = base.get(i).copied().unwrap_or(0);
                    prop_assert_eq!(*byte, old);
                }
            }
        }

        #[test]
        fn truncate_sets_exact_length(
            base in proptest::collection::vec(any::<u8>(), 0..64),
            len in 0u64..128,
        ) {
            let ns = ns();
            ns.write_data("/f", &base, 0).unwrap();
            ns.truncate("/f", len).unwrap();
            let all = ns.read_range("/f", 0, u64::MAX).unwrap();
            prop_assert_eq!(all.len() as u64, len);
            for (i, byte) in all.iter().enumerate() {
                prop_assert_eq!(*byte, base.get(i).copied().unwrap_or(0));
            }
        }
    }
}
