//! Node rows and repository for the metadata tree.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use super::ROOT_NAME;
use crate::{Result, SkyvaultError};

const NODE_COLUMNS: &str =
    "id, is_folder, name, parent_id, created_at, last_accessed_at, last_modified_at";

/// A folder or file entry in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Node {
    /// Store-assigned node ID.
    pub id: i64,
    /// Whether this node is a folder.
    pub is_folder: bool,
    /// Name, unique within the parent.
    pub name: String,
    /// Parent folder ID (None only for the root).
    pub parent_id: Option<i64>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last read.
    pub last_accessed_at: DateTime<Utc>,
    /// When the node was last written.
    pub last_modified_at: DateTime<Utc>,
}

impl Node {
    /// Whether this node is the root of the tree.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data for creating a new node.
#[derive(Debug, Clone)]
pub struct NewNode {
    /// Whether the node is a folder.
    pub is_folder: bool,
    /// Node name.
    pub name: String,
    /// Parent folder ID.
    pub parent_id: Option<i64>,
}

impl NewNode {
    /// A folder node with no parent yet.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            is_folder: true,
            name: name.into(),
            parent_id: None,
        }
    }

    /// A file node with no parent yet.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            is_folder: false,
            name: name.into(),
            parent_id: None,
        }
    }

    /// The root folder.
    pub fn root() -> Self {
        Self::folder(ROOT_NAME)
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Repository for node operations.
///
/// Every method runs a single statement, so it accepts either the pool or
/// a connection borrowed from an open transaction.
pub struct NodeRepository;

impl NodeRepository {
    /// Insert a node and return the stored row.
    pub async fn create<'e, E>(executor: E, node: &NewNode) -> Result<Node>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO nodes (is_folder, name, parent_id, created_at, last_accessed_at, last_modified_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {NODE_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Node>(&sql)
            .bind(node.is_folder)
            .bind(&node.name)
            .bind(node.parent_id)
            .bind(now)
            .bind(now)
            .bind(now)
            .fetch_one(executor)
            .await?;

        Ok(created)
    }

    /// Insert a folder under `parent_id` unless a node with that name is
    /// already there.
    ///
    /// Returns `true` if a row was inserted.
    pub async fn create_folder_if_absent<'e, E>(
        executor: E,
        parent_id: i64,
        name: &str,
    ) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO nodes (is_folder, name, parent_id, created_at, last_accessed_at, last_modified_at)
             VALUES (1, ?, ?, ?, ?, ?)
             ON CONFLICT(parent_id, name) DO NOTHING",
        )
        .bind(name)
        .bind(parent_id)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a node by ID.
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Node>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?");
        let node = sqlx::query_as::<_, Node>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(node)
    }

    /// Find the child of `parent_id` with exactly this name.
    pub async fn find_child<'e, E>(executor: E, parent_id: i64, name: &str) -> Result<Option<Node>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id = ? AND name = ?");
        let node = sqlx::query_as::<_, Node>(&sql)
            .bind(parent_id)
            .bind(name)
            .fetch_optional(executor)
            .await?;

        Ok(node)
    }

    /// Get the root node (the one without a parent).
    pub async fn get_root<'e, E>(executor: E) -> Result<Option<Node>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id IS NULL ORDER BY id LIMIT 1");
        let node = sqlx::query_as::<_, Node>(&sql)
            .fetch_optional(executor)
            .await?;

        Ok(node)
    }

    /// List the children of a folder, folders first, then by name.
    pub async fn list_children<'e, E>(executor: E, parent_id: i64) -> Result<Vec<Node>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id = ? ORDER BY is_folder DESC, name"
        );
        let nodes = sqlx::query_as::<_, Node>(&sql)
            .bind(parent_id)
            .fetch_all(executor)
            .await?;

        Ok(nodes)
    }

    /// List the IDs of a node's direct children.
    pub async fn list_child_ids<'e, E>(executor: E, parent_id: i64) -> Result<Vec<i64>>
    where
        E: SqliteExecutor<'e>,
    {
        let ids = sqlx::query_scalar("SELECT id FROM nodes WHERE parent_id = ? ORDER BY id")
            .bind(parent_id)
            .fetch_all(executor)
            .await?;

        Ok(ids)
    }

    /// Delete a node by ID.
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every node whose declared parent no longer exists.
    ///
    /// Single pass: children of the removed nodes become orphans themselves
    /// and are only removed by a later call.
    pub async fn delete_orphans<'e, E>(executor: E) -> Result<u64>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM nodes
             WHERE parent_id IS NOT NULL
               AND parent_id NOT IN (SELECT id FROM nodes)",
        )
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count all nodes, the root included.
    pub async fn count<'e, E>(executor: E) -> Result<i64>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Return the root node, creating it on first use.
    pub async fn ensure_root<'e, E>(executor: E) -> Result<Node>
    where
        E: SqliteExecutor<'e> + Copy,
    {
        if let Some(root) = Self::get_root(executor).await? {
            if !root.is_folder {
                return Err(SkyvaultError::StoreUnavailable(format!(
                    "root node {} is not a folder",
                    root.id
                )));
            }
            return Ok(root);
        }

        Self::create(executor, &NewNode::root()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_root_is_stable() {
        let db = setup_db().await;

        let first = NodeRepository::ensure_root(db.pool()).await.unwrap();
        let second = NodeRepository::ensure_root(db.pool()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, ROOT_NAME);
        assert!(first.is_folder);
        assert!(first.is_root());
        assert_eq!(NodeRepository::count(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();

        let created = NodeRepository::create(db.pool(), &NewNode::folder("docs").with_parent(root.id))
            .await
            .unwrap();

        let found = NodeRepository::get_by_id(db.pool(), created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert_eq!(found.parent_id, Some(root.id));
        assert!(found.is_folder);
        assert_eq!(found.created_at, found.last_modified_at);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let db = setup_db().await;
        assert!(NodeRepository::get_by_id(db.pool(), 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_child_is_parent_scoped() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();
        let docs = NodeRepository::create(db.pool(), &NewNode::folder("docs").with_parent(root.id))
            .await
            .unwrap();
        let archive =
            NodeRepository::create(db.pool(), &NewNode::folder("archive").with_parent(root.id))
                .await
                .unwrap();
        let notes = NodeRepository::create(db.pool(), &NewNode::folder("notes").with_parent(docs.id))
            .await
            .unwrap();

        let found = NodeRepository::find_child(db.pool(), docs.id, "notes")
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.id), Some(notes.id));

        let elsewhere = NodeRepository::find_child(db.pool(), archive.id, "notes")
            .await
            .unwrap();
        assert!(elsewhere.is_none());
    }

    #[tokio::test]
    async fn test_create_folder_if_absent() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();

        assert!(NodeRepository::create_folder_if_absent(db.pool(), root.id, "a")
            .await
            .unwrap());
        assert!(!NodeRepository::create_folder_if_absent(db.pool(), root.id, "a")
            .await
            .unwrap());

        assert_eq!(NodeRepository::list_child_ids(db.pool(), root.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_under_parent_rejected() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();

        NodeRepository::create(db.pool(), &NewNode::file("a.txt").with_parent(root.id))
            .await
            .unwrap();
        let result =
            NodeRepository::create(db.pool(), &NewNode::file("a.txt").with_parent(root.id)).await;

        assert!(matches!(result, Err(SkyvaultError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_list_children_order() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();

        for node in [
            NewNode::file("b.txt"),
            NewNode::folder("zeta"),
            NewNode::file("a.txt"),
            NewNode::folder("alpha"),
        ] {
            NodeRepository::create(db.pool(), &node.with_parent(root.id))
                .await
                .unwrap();
        }

        let names: Vec<String> = NodeRepository::list_children(db.pool(), root.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();
        let node = NodeRepository::create(db.pool(), &NewNode::folder("tmp").with_parent(root.id))
            .await
            .unwrap();

        assert!(NodeRepository::delete(db.pool(), node.id).await.unwrap());
        assert!(!NodeRepository::delete(db.pool(), node.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_orphans_single_pass() {
        let db = setup_db().await;
        let root = NodeRepository::ensure_root(db.pool()).await.unwrap();
        let a = NodeRepository::create(db.pool(), &NewNode::folder("a").with_parent(root.id))
            .await
            .unwrap();
        let b = NodeRepository::create(db.pool(), &NewNode::folder("b").with_parent(a.id))
            .await
            .unwrap();
        let c = NodeRepository::create(db.pool(), &NewNode::folder("c").with_parent(b.id))
            .await
            .unwrap();

        NodeRepository::delete(db.pool(), a.id).await.unwrap();

        assert_eq!(NodeRepository::delete_orphans(db.pool()).await.unwrap(), 1);
        assert!(NodeRepository::get_by_id(db.pool(), b.id).await.unwrap().is_none());
        assert!(NodeRepository::get_by_id(db.pool(), c.id).await.unwrap().is_some());

        assert_eq!(NodeRepository::delete_orphans(db.pool()).await.unwrap(), 1);
        assert!(NodeRepository::get_by_id(db.pool(), c.id).await.unwrap().is_none());

        assert_eq!(NodeRepository::delete_orphans(db.pool()).await.unwrap(), 0);
        assert!(NodeRepository::get_by_id(db.pool(), root.id).await.unwrap().is_some());
    }
}
