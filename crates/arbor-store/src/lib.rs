//! Content-addressed object storage for arborfs.
//!
//! Every file's bytes and every directory listing is stored as an immutable
//! object identified by its BLAKE3 hash (domain-separated by object kind),
//! much like git's `.git/objects/`.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file contents
//! - [`Tree`] -- directory listing mapping names to child ids and kinds
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileObjectStore`] -- sharded on-disk store with atomic, synced writes
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. Write-then-link: an object is durably stored before its id is returned,
//!    so nothing can reference an object that is not yet persisted.
//! 3. Writes of identical content are idempotent and need no locking.
//! 4. The store never interprets payloads; decoding lives on [`Blob`]/[`Tree`].

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod object;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, EntryKind, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
