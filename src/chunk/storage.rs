//! Physical chunk storage.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::Result;

/// Raw object storage keyed by chunk hash.
///
/// Keys passed to a backend are already validated. Implementations only
/// move bytes; deduplication and hash checks live in
/// [`ChunkStore`](super::ChunkStore).
pub trait ChunkBackend: Send + Sync {
    /// Whether an object is stored under `key`.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Store `bytes` under `key`, replacing any previous object.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read the object stored under `key`, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the object stored under `key`; returns `false` if absent.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Filesystem chunk backend.
///
/// Objects are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── ba/
/// │   └── ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
/// ├── e3/
/// │   └── e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
/// └── .tmp-<uuid>   (in-flight writes)
/// ```
#[derive(Debug, Clone)]
pub struct FsChunkBackend {
    base_path: PathBuf,
}

impl FsChunkBackend {
    /// Create a backend rooted at `base_path`, creating the directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Full path of the object stored under `key`.
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::shard(key)).join(key)
    }

    fn shard(key: &str) -> &str {
        key.get(..2).unwrap_or(key)
    }
}

impl ChunkBackend for FsChunkBackend {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.object_path(key).is_file())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let target = self.object_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // Readers never see a partially written object.
        let tmp = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &target)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Wrote chunk {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.object_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.object_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
