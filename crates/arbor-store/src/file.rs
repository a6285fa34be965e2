//! Sharded on-disk object store.
//!
//! Layout:
//! ```text
//! {root}/
//! └── objects/
//!     ├── 3f/
//!     │   └── 9a01...   # "<kind> <size>\0" header followed by the payload
//!     └── c2/
//!         └── 77de...
//! ```
//!
//! New objects are written to a temporary file inside `objects/`, synced, and
//! renamed into place. A reader therefore sees either no file or the complete
//! object, and an id is only handed back once the object is on disk.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use arbor_types::ObjectId;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Longest possible header: "blob " or "tree ", 20 size digits and the NUL.
const MAX_HEADER_LEN: u64 = 26;

/// Filesystem-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    objects_dir: PathBuf,
    config: StoreConfig,
}

impl FileObjectStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        debug!(path = %objects_dir.display(), ?config, "opened object store");
        Ok(Self {
            objects_dir,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Where the object with `id` lives (whether or not it exists).
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, rest) = id.shard();
        self.objects_dir.join(dir).join(rest)
    }

    fn encode(object: &StoredObject) -> Vec<u8> {
        let header = format!("{} {}\0", object.kind, object.size);
        let mut out = Vec::with_capacity(header.len() + object.data.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&object.data);
        out
    }

    fn corrupt(id: &ObjectId, reason: &str) -> StoreError {
        StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        }
    }

    /// Parse the `"<kind> <size>"` header, without its terminator.
    fn parse_header(id: &ObjectId, header: &[u8]) -> StoreResult<(ObjectKind, u64)> {
        let header =
            std::str::from_utf8(header).map_err(|_| Self::corrupt(id, "header is not utf-8"))?;
        let (tag, size) = header
            .split_once(' ')
            .ok_or_else(|| Self::corrupt(id, "malformed header"))?;
        let kind =
            ObjectKind::parse(tag).ok_or_else(|| Self::corrupt(id, "unknown object kind"))?;
        let size: u64 = size
            .parse()
            .map_err(|_| Self::corrupt(id, "malformed size"))?;
        Ok((kind, size))
    }

    fn decode(id: &ObjectId, raw: &[u8]) -> StoreResult<StoredObject> {
        let nul = raw
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Self::corrupt(id, "missing header terminator"))?;
        let (kind, size) = Self::parse_header(id, &raw[..nul])?;

        let data = raw[nul + 1..].to_vec();
        if data.len() as u64 != size {
            return Err(Self::corrupt(id, "payload length does not match header"));
        }
        Ok(StoredObject::new(kind, data))
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> StoreResult<()> {
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> StoreResult<()> {
        Ok(())
    }
}

impl ObjectStore for FileObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let raw = match fs::read(self.object_path(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = Self::decode(id, &raw)?;

        if self.config.verify_reads && !object.verify(id) {
            let computed = object.compute_id();
            warn!(id = %id.short_hex(), computed = %computed.short_hex(), "object failed verification");
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    /// Reads the header and the file length only; the payload is neither
    /// loaded nor verified.
    fn header(&self, id: &ObjectId) -> StoreResult<Option<(ObjectKind, u64)>> {
        let file = match File::open(self.object_path(id)) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();

        let mut raw = Vec::with_capacity(MAX_HEADER_LEN as usize);
        BufReader::new(file)
            .take(MAX_HEADER_LEN)
            .read_until(0, &mut raw)?;
        if raw.pop() != Some(0) {
            return Err(Self::corrupt(id, "missing header terminator"));
        }
        let (kind, size) = Self::parse_header(id, &raw)?;
        if file_len != raw.len() as u64 + 1 + size {
            return Err(Self::corrupt(id, "payload length does not match header"));
        }
        Ok(Some((kind, size)))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }

        let shard = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.objects_dir.clone());
        fs::create_dir_all(&shard)?;

        let mut tmp = NamedTempFile::new_in(&self.objects_dir)?;
        tmp.write_all(&Self::encode(object))?;
        if self.config.sync_writes {
            tmp.as_file().sync_all()?;
        }
        // Renaming over an object some other writer just finished is harmless:
        // both files hold identical bytes.
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        if self.config.sync_writes {
            Self::sync_dir(&shard)?;
        }

        debug!(id = %id.short_hex(), kind = %object.kind, size = object.size, "stored object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).exists())
    }
}
