//! Metadata tree for SkyVault.
//!
//! This module maintains the folder/file hierarchy over content-addressed
//! chunks:
//! - Node and file metadata rows with their repositories
//! - Parent-scoped path resolution and idempotent folder-chain creation
//! - Breadth-first subtree collection and cascading deletion
//! - Background removal of orphaned nodes

mod metadata;
mod mutator;
mod node;
mod resolver;
mod service;
mod subtree;
mod sweeper;

pub use metadata::{FileDetails, FileMetadata, FileMetadataRepository, NewFileMetadata};
pub use mutator::{SaveRequest, TreeMutator};
pub use node::{NewNode, Node, NodeRepository};
pub use resolver::{PathResolver, Resolution};
pub use service::MetadataService;
pub use subtree::{CascadingDeleter, DeleteOutcome, SubtreeCollector};
pub use sweeper::{OrphanSweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL_SECS};

use crate::{Result, SkyvaultError};

/// Name given to the root folder.
pub const ROOT_NAME: &str = "root";

/// Split a slash-delimited folder path into its non-empty segments.
///
/// Leading, trailing and doubled slashes produce no segments.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Derive the file type from a file name's extension.
///
/// The type is the text after the last dot. Names without a dot, names
/// ending in a dot and names containing a slash are rejected.
pub fn file_type(file_name: &str) -> Result<String> {
    if file_name.contains('/') {
        return Err(SkyvaultError::InvalidName(format!(
            "file name '{file_name}' contains a path separator"
        )));
    }

    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Ok(ext.to_string()),
        _ => Err(SkyvaultError::InvalidName(format!(
            "file name '{file_name}' has no extension"
        ))),
    }
}
