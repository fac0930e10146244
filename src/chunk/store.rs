//! Dedup-aware chunk store.

use tracing::{debug, warn};

use super::{content_hash, validate_hash, ChunkBackend, FsChunkBackend};
use crate::{Result, SkyvaultError};

/// What a [`ChunkStore::put`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The chunk was new and has been written.
    Stored,
    /// A chunk with this hash already existed; nothing was written.
    Deduplicated,
}

/// Content-addressed chunk store with put-if-absent semantics.
#[derive(Debug, Clone)]
pub struct ChunkStore<B: ChunkBackend = FsChunkBackend> {
    backend: B,
    verify_hashes: bool,
}

impl<B: ChunkBackend> ChunkStore<B> {
    /// Create a store that trusts caller-supplied hashes.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            verify_hashes: false,
        }
    }

    /// Enable or disable checking each put's hash against its payload.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Store `bytes` under `hash` unless an object with that hash exists.
    pub fn put(&self, hash: &str, bytes: &[u8]) -> Result<PutOutcome> {
        validate_hash(hash)?;
        if bytes.is_empty() {
            return Err(SkyvaultError::InvalidRequest(format!(
                "chunk {hash} has no content"
            )));
        }
        if self.verify_hashes {
            let actual = content_hash(bytes);
            if actual != hash {
                warn!("Rejected chunk {}: content hashes to {}", hash, actual);
                return Err(SkyvaultError::InvalidRequest(format!(
                    "chunk hash mismatch: expected {hash}, content hashes to {actual}"
                )));
            }
        }

        if self.backend.exists(hash)? {
            debug!("Chunk {} already stored", hash);
            return Ok(PutOutcome::Deduplicated);
        }

        self.backend.write(hash, bytes)?;
        Ok(PutOutcome::Stored)
    }

    /// Fetch the chunk stored under `hash`.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>> {
        validate_hash(hash)?;
        self.backend
            .read(hash)?
            .ok_or_else(|| SkyvaultError::NotFound(format!("chunk {hash}")))
    }

    /// Remove the chunk stored under `hash`.
    pub fn delete(&self, hash: &str) -> Result<()> {
        validate_hash(hash)?;
        if self.backend.remove(hash)? {
            debug!("Deleted chunk {}", hash);
            Ok(())
        } else {
            Err(SkyvaultError::NotFound(format!("chunk {hash}")))
        }
    }

    pub fn exists(&self, hash: &str) -> Result<bool> {
        validate_hash(hash)?;
        self.backend.exists(hash)
    }
}
