//! Metadata service for SkyVault.
//!
//! Entry point for the save, fetch and delete operations. The root folder
//! is resolved (or created) once when the service is built and then handed
//! to every component explicitly.

use tokio::time::Duration;
use tracing::info;

use super::{
    CascadingDeleter, DeleteOutcome, FileDetails, FileMetadataRepository, Node, NodeRepository,
    OrphanSweeper, PathResolver, SaveRequest, SubtreeCollector, TreeMutator,
};
use crate::db::Database;
use crate::{Result, SkyvaultError};

/// High-level access to the metadata tree.
#[derive(Debug, Clone)]
pub struct MetadataService {
    db: Database,
    root_id: i64,
}

impl MetadataService {
    /// Build the service, creating the root folder on first use.
    pub async fn new(db: Database) -> Result<Self> {
        let root = NodeRepository::ensure_root(db.pool()).await?;
        info!("Metadata tree root is node {}", root.id);
        Ok(Self {
            db,
            root_id: root.id,
        })
    }

    /// ID of the root folder.
    pub fn root_id(&self) -> i64 {
        self.root_id
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.db.pool(), self.root_id)
    }

    pub fn mutator(&self) -> TreeMutator<'_> {
        TreeMutator::new(&self.db, self.root_id)
    }

    pub fn collector(&self) -> SubtreeCollector<'_> {
        SubtreeCollector::new(self.db.pool())
    }

    pub fn deleter(&self) -> CascadingDeleter<'_> {
        CascadingDeleter::new(&self.db)
    }

    /// An orphan sweeper sharing this service's pool.
    ///
    /// Fails with `InvalidRequest` if `interval` is zero.
    pub fn sweeper(&self, interval: Duration) -> Result<OrphanSweeper> {
        OrphanSweeper::with_interval(self.db.pool().clone(), interval)
    }

    /// Save a folder path or a file; returns the resulting node ID.
    pub async fn save(&self, request: &SaveRequest) -> Result<i64> {
        self.mutator().save(request).await
    }

    /// Fetch a file node's name, size, timestamps and chunk list.
    ///
    /// Folders and unknown IDs yield `NotFound`.
    pub async fn fetch(&self, node_id: i64) -> Result<FileDetails> {
        FileMetadataRepository::get_details(self.db.pool(), node_id)
            .await?
            .ok_or_else(|| SkyvaultError::NotFound(format!("file metadata for node {node_id}")))
    }

    /// Delete a node and its whole subtree. Unknown IDs are a no-op.
    pub async fn delete(&self, node_id: i64) -> Result<DeleteOutcome> {
        self.deleter().delete_subtree(node_id).await
    }

    /// Get any node by ID.
    pub async fn get_node(&self, node_id: i64) -> Result<Node> {
        NodeRepository::get_by_id(self.db.pool(), node_id)
            .await?
            .ok_or_else(|| SkyvaultError::NotFound(format!("node {node_id}")))
    }

    /// List the direct children of a folder.
    pub async fn list_folder(&self, folder_id: i64) -> Result<Vec<Node>> {
        let folder = self.get_node(folder_id).await?;
        if !folder.is_folder {
            return Err(SkyvaultError::InvalidRequest(format!(
                "node {folder_id} is not a folder"
            )));
        }
        NodeRepository::list_children(self.db.pool(), folder_id).await
    }
}
