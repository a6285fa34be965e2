//! Foundation types for arborfs.
//!
//! Every object in the namespace (file contents, directory listings) is named
//! by an [`ObjectId`]: the BLAKE3 digest of its serialized bytes. The id is the
//! object's identity, so identical content always shares one id and one slot in
//! the object store.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
