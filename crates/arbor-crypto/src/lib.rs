//! Content hashing for arborfs.
//!
//! Object ids are BLAKE3 digests taken over a per-kind domain tag followed by
//! the object's serialized bytes. Wraps the `blake3` crate; no custom
//! cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
