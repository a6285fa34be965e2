//! Durable root reference stored as a single pointer file.
//!
//! The file holds the root id as 64 hex characters and a newline. Updates
//! write a synced temporary file beside it and rename it over the old one,
//! so a reader opening the file sees either the old or the new id, never a
//! mix. A swap holds an exclusive advisory lock on `ROOT.lock` from the
//! re-read to the rename, so every handle on the repository, in this process
//! or another, sees swaps in one total order.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use arbor_types::ObjectId;
use fs4::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{RefError, Result};
use crate::traits::RootRef;

/// A [`RootRef`] persisted at a filesystem path.
#[derive(Debug)]
pub struct FileRootRef {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileRootRef {
    /// Open an existing reference file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(RefError::Uninitialized);
        }
        let this = Self::at(path);
        // Surface a corrupt file at open time rather than on first use.
        this.load()?;
        Ok(this)
    }

    /// Create a new reference file pointing at `root`.
    pub fn create(path: impl Into<PathBuf>, root: &ObjectId) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(RefError::AlreadyExists);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::write_atomic(&path, root)?;
        info!(path = %path.display(), root = %root.short_hex(), "created root reference");
        Ok(Self::at(path))
    }

    fn at(path: PathBuf) -> Self {
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until this process holds the swap lock. Released when the
    /// returned file is dropped.
    fn acquire_lock(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn write_atomic(path: &Path, root: &ObjectId) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{root}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RefError::Io(e.error))?;
        Self::sync_dir(dir)
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> Result<()> {
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> Result<()> {
        Ok(())
    }
}

impl RootRef for FileRootRef {
    fn load(&self) -> Result<ObjectId> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RefError::Uninitialized
            } else {
                RefError::Io(e)
            }
        })?;
        Ok(ObjectId::from_hex(&text)?)
    }

    fn compare_and_swap(&self, expected: &ObjectId, new: &ObjectId) -> Result<()> {
        let _lock = self.acquire_lock()?;

        let actual = self.load()?;
        if actual != *expected {
            return Err(RefError::Conflict {
                expected: *expected,
                actual,
            });
        }
        Self::write_atomic(&self.path, new)?;
        debug!(from = %expected.short_hex(), to = %new.short_hex(), "root swapped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ObjectId {
        ObjectId::from_hash([n; 32])
    }

    #[test]
    fn create_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        FileRootRef::create(&path, &id(7)).unwrap();

        let reopened = FileRootRef::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), id(7));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{}\n", id(7).to_hex())
        );
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        FileRootRef::create(&path, &id(1)).unwrap();
        assert!(matches!(
            FileRootRef::create(&path, &id(2)),
            Err(RefError::AlreadyExists)
        ));
    }

    #[test]
    fn open_missing_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileRootRef::open(dir.path().join("ROOT")),
            Err(RefError::Uninitialized)
        ));
    }

    #[test]
    fn open_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        fs::write(&path, "not-a-hash\n").unwrap();
        assert!(matches!(FileRootRef::open(&path), Err(RefError::Corrupt(_))));
    }

    #[test]
    fn swap_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        let r = FileRootRef::create(&path, &id(1)).unwrap();
        r.compare_and_swap(&id(1), &id(2)).unwrap();
        drop(r);

        assert_eq!(FileRootRef::open(&path).unwrap().load().unwrap(), id(2));
    }

    #[test]
    fn stale_swap_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let r = FileRootRef::create(dir.path().join("ROOT"), &id(1)).unwrap();
        r.compare_and_swap(&id(1), &id(2)).unwrap();

        let err = r.compare_and_swap(&id(1), &id(3)).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(r.load().unwrap(), id(2));
    }

    #[test]
    fn swap_leaves_only_root_and_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        let r = FileRootRef::create(&path, &id(1)).unwrap();
        r.compare_and_swap(&id(1), &id(2)).unwrap();
        r.compare_and_swap(&id(2), &id(3)).unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["ROOT", "ROOT.lock"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n", id(3)));
    }

    #[test]
    fn separate_handles_have_one_winner() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        FileRootRef::create(&path, &id(0)).unwrap();

        let path = Arc::new(path);
        let handles: Vec<_> = (1..=8u8)
            .map(|n| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let r = FileRootRef::open(path.as_path()).unwrap();
                    r.compare_and_swap(&id(0), &id(n)).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(dir.path().join("ROOT.lock").is_file());
    }

    #[test]
    fn swap_chain_across_handles_loses_nothing() {
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ROOT");
        FileRootRef::create(&path, &id(0)).unwrap();

        // Each thread bumps the counter encoded in byte 0, retrying on conflict.
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || {
                    let r = FileRootRef::open(&path).unwrap();
                    for _ in 0..25 {
                        loop {
                            let cur = r.load().unwrap();
                            let next = id(cur.as_bytes()[0] + 1);
                            match r.compare_and_swap(&cur, &next) {
                                Ok(()) => break,
                                Err(e) if e.is_conflict() => continue,
                                Err(e) => panic!("unexpected error: {e}"),
                            }
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(FileRootRef::open(&path).unwrap().load().unwrap(), id(100));
    }
}
