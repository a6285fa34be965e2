//! Root reference management for arborfs.
//!
//! The root reference is the only mutable cell in a namespace: it names the
//! id of the current top-level tree. Everything reachable from it is an
//! immutable object. Writers advance it with compare-and-swap, so committed
//! root transitions form a single total order and readers always see some
//! complete tree.
//!
//! # Modules
//!
//! - [`error`] -- Error types, including the internal swap [`RefError::Conflict`]
//! - [`traits`] -- The [`RootRef`] trait
//! - [`memory`] -- [`InMemoryRootRef`] for tests and embedding
//! - [`file`] -- [`FileRootRef`], a durable pointer file

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{RefError, Result};
pub use file::FileRootRef;
pub use memory::InMemoryRootRef;
pub use traits::RootRef;
