use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of an object id in bytes.
pub const OBJECT_ID_LEN: usize = 32;

/// Content-addressed identifier for a blob or tree.
///
/// An `ObjectId` is a 32-byte BLAKE3 digest. Two objects with the same
/// serialized content always share the same id, so the id doubles as the
/// deduplication key in every object store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Undomained BLAKE3 digest of `data`.
    ///
    /// Object stores hash through `arbor_crypto::ContentHasher` instead; this
    /// is for fixtures and ad-hoc ids.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a digest that was computed elsewhere.
    pub const fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Full lowercase hex (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Split the hex form into a two-character fan-out directory and the
    /// remaining 62 characters, git-objects style.
    pub fn shard(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, rest) = hex.split_at(2);
        (dir.to_string(), rest.to_string())
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let arr: [u8; OBJECT_ID_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| TypeError::InvalidLength {
                    expected: OBJECT_ID_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}
