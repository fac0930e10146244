//! Subtree enumeration and cascading deletion.

use std::collections::{HashSet, VecDeque};

use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{FileMetadataRepository, NodeRepository};
use crate::db::{Database, DbPool};
use crate::{Result, SkyvaultError};

/// Enumerates a node and all of its descendants breadth-first.
pub struct SubtreeCollector<'a> {
    pool: &'a DbPool,
}

impl<'a> SubtreeCollector<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Collect `root_id` and every descendant, in breadth-first order.
    pub async fn collect(&self, root_id: i64) -> Result<Vec<i64>> {
        let mut conn = self.pool.acquire().await?;
        Self::collect_in(&mut conn, root_id).await
    }

    /// Same as [`collect`](Self::collect) on an existing connection, so the
    /// walk can share a transaction with the deletion that follows it.
    ///
    /// Each ID is visited once even if the parent relation contains a cycle.
    pub async fn collect_in(conn: &mut SqliteConnection, root_id: i64) -> Result<Vec<i64>> {
        let mut collected = vec![root_id];
        let mut seen = HashSet::from([root_id]);
        let mut queue = VecDeque::from([root_id]);

        while let Some(current) = queue.pop_front() {
            for child in NodeRepository::list_child_ids(&mut *conn, current).await? {
                if seen.insert(child) {
                    collected.push(child);
                    queue.push_back(child);
                }
            }
        }

        Ok(collected)
    }
}

/// Counts of rows removed by a subtree deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Node rows removed, the subtree root included.
    pub nodes_deleted: u64,
    /// File metadata rows removed.
    pub files_deleted: u64,
}

impl DeleteOutcome {
    /// Whether anything was deleted.
    pub fn is_noop(&self) -> bool {
        self.nodes_deleted == 0
    }
}

/// Deletes a node, its descendants and their file metadata.
pub struct CascadingDeleter<'a> {
    db: &'a Database,
}

impl<'a> CascadingDeleter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete the subtree rooted at `node_id`.
    ///
    /// Collection and deletion run in one transaction. Deleting an unknown
    /// ID is a no-op; deleting the tree root is rejected.
    pub async fn delete_subtree(&self, node_id: i64) -> Result<DeleteOutcome> {
        let mut tx = self.db.begin().await?;

        let Some(node) = NodeRepository::get_by_id(&mut *tx, node_id).await? else {
            debug!("Delete of unknown node {} ignored", node_id);
            return Ok(DeleteOutcome::default());
        };
        if node.is_root() {
            return Err(SkyvaultError::InvalidRequest(
                "the root folder cannot be deleted".to_string(),
            ));
        }

        let ids = SubtreeCollector::collect_in(&mut tx, node_id).await?;

        let mut outcome = DeleteOutcome::default();
        for id in &ids {
            if FileMetadataRepository::delete_by_node(&mut *tx, *id).await? {
                outcome.files_deleted += 1;
            }
            if NodeRepository::delete(&mut *tx, *id).await? {
                outcome.nodes_deleted += 1;
            }
        }

        tx.commit().await?;

        info!(
            "Deleted subtree of node {} ({} node(s), {} file(s))",
            node_id, outcome.nodes_deleted, outcome.files_deleted
        );
        Ok(outcome)
    }
}
