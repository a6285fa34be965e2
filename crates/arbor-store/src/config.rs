use serde::{Deserialize, Serialize};

/// Durability and integrity knobs for on-disk object stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `fsync` each new object (and its shard directory) before returning
    /// its id.
    pub sync_writes: bool,
    /// Recompute the content hash of every object read back from disk.
    pub verify_reads: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_writes: true,
            verify_reads: true,
        }
    }
}

impl StoreConfig {
    /// No fsync, no read verification. For scratch repositories and tests.
    pub fn fast() -> Self {
        Self {
            sync_writes: false,
            verify_reads: false,
        }
    }
}
