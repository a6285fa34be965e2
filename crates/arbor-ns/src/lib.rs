//! Copy-on-write filesystem namespace for arborfs.
//!
//! A [`Namespace`] exposes files and directories (create, read, write,
//! truncate, delete, list) on top of an immutable object graph: file bytes
//! are [`Blob`]s, directories are [`Tree`]s, and a single [`RootRef`] names
//! the current top-level tree.
//!
//! A mutation never edits an object. It resolves the parent directory,
//! builds the new leaf object, rewrites each ancestor tree bottom-up with the
//! one changed entry, stores all of them, and finally compare-and-swaps the
//! root reference from the root it started from to the new one. If another
//! writer got there first the whole edit is replayed against the newer root.
//! Reads go through a [`Snapshot`] pinned to one root id, so they never see
//! a half-applied change.
//!
//! [`RootRef`]: arbor_refs::RootRef

pub mod config;
pub mod error;
pub mod namespace;
pub mod path;
pub mod preview;
pub mod repository;
pub mod resolve;
pub mod snapshot;
mod update;

pub use config::RepoConfig;
pub use error::{NamespaceError, NamespaceResult};
pub use namespace::Namespace;
pub use path::NsPath;
pub use resolve::{Level, Node, ResolvedPath};
pub use snapshot::{Metadata, Snapshot};

// Re-export key types
pub use arbor_store::{Blob, EntryKind, Tree, TreeEntry};
pub use arbor_types::ObjectId;
