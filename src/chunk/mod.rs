//! Content-addressed chunk storage.
//!
//! - Chunk keys are content hashes (lowercase hex SHA-256 by default)
//! - Objects live in a directory sharded by the first 2 characters of the key
//! - Writes are deduplicated: a second put of an existing key is a no-op

mod storage;
mod store;

pub use storage::{ChunkBackend, FsChunkBackend};
pub use store::{ChunkStore, PutOutcome};

use sha2::{Digest, Sha256};

use crate::{Result, SkyvaultError};

/// Maximum accepted length of a chunk hash.
pub const MAX_HASH_LENGTH: usize = 128;

/// Compute the content hash used as a chunk key.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Check that `hash` is usable as a chunk key.
///
/// Keys become file names, so only ASCII alphanumerics, `-` and `_` are
/// accepted.
pub fn validate_hash(hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(SkyvaultError::InvalidRequest(
            "chunk hash is empty".to_string(),
        ));
    }
    if hash.len() > MAX_HASH_LENGTH {
        return Err(SkyvaultError::InvalidRequest(format!(
            "chunk hash is longer than {MAX_HASH_LENGTH} characters"
        )));
    }
    if !hash
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SkyvaultError::InvalidRequest(format!(
            "chunk hash contains invalid characters: {hash}"
        )));
    }
    Ok(())
}
