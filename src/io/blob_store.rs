//! Named byte-blob storage for precomputed cost tables.
//!
//! The engine keeps these in compressed archives; that machinery stays
//! outside this crate. [`FileBlobStore`] is the bundled flat-file
//! implementation, one blob per file under `{root}/paths/`.

use crate::error::{MargaError, Result};
use log::warn;
use std::fs;
use std::path::PathBuf;

/// A place to keep named blobs between runs.
pub trait BlobStore {
    /// Fetch a blob, `None` if absent or unreadable.
    fn read(&self, name: &str) -> Option<Vec<u8>>;

    /// Persist a blob under `name`, replacing any previous content.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Flat-file blob store rooted at a cache directory.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_dir.into(),
        }
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join("paths").join(name)
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.blob_path(name);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("[BlobStore] failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(name);
        let dir = path
            .parent()
            .ok_or_else(|| MargaError::BlobStore(format!("no parent dir for {name}")))?;
        fs::create_dir_all(dir)?;
        fs::write(&path, bytes)?;
        Ok(())
    }
}

/// Store that persists nothing; every load is a miss.
pub struct NullBlobStore;

impl BlobStore for NullBlobStore {
    fn read(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    fn write(&self, _name: &str, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}
