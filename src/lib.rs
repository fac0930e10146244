//! SkyVault - chunked cloud file storage
//!
//! Keeps a folder/file hierarchy in SQLite over a content-addressed chunk
//! store, with idempotent path creation, cascading subtree deletion and a
//! background sweeper for orphaned nodes.

pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod tree;
pub mod vault;

pub use chunk::{content_hash, ChunkBackend, ChunkStore, FsChunkBackend, PutOutcome};
pub use config::Config;
pub use db::{Database, DbPool};
pub use error::{ErrorKind, Result, SkyvaultError};
pub use tree::{
    CascadingDeleter, DeleteOutcome, FileDetails, FileMetadata, FileMetadataRepository,
    MetadataService, NewFileMetadata, NewNode, Node, NodeRepository, OrphanSweeper, PathResolver,
    Resolution, SaveRequest, SubtreeCollector, SweeperHandle, TreeMutator,
};
pub use vault::{UploadReceipt, Vault};
