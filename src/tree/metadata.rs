//! File metadata rows and repository for the metadata tree.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::Result;

/// Content description of a file node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Unique metadata ID.
    pub id: i64,
    /// Extension-derived file type.
    pub file_type: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Chunk hashes in file order.
    pub chunk_hashes: Vec<String>,
    /// Owning file node.
    pub node_id: i64,
}

#[derive(sqlx::FromRow)]
struct FileMetadataRow {
    id: i64,
    file_type: String,
    file_size: i64,
    chunk_hashes: String,
    node_id: i64,
}

impl TryFrom<FileMetadataRow> for FileMetadata {
    type Error = crate::SkyvaultError;

    fn try_from(row: FileMetadataRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            file_type: row.file_type,
            file_size: row.file_size,
            chunk_hashes: serde_json::from_str(&row.chunk_hashes)?,
            node_id: row.node_id,
        })
    }
}

/// Data for creating a file metadata row.
#[derive(Debug, Clone)]
pub struct NewFileMetadata {
    /// Extension-derived file type.
    pub file_type: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Chunk hashes in file order.
    pub chunk_hashes: Vec<String>,
    /// Owning file node.
    pub node_id: i64,
}

/// A file node joined with its metadata, as returned by fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDetails {
    pub node_id: i64,
    pub name: String,
    pub file_type: String,
    pub file_size: i64,
    pub chunk_hashes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FileDetailsRow {
    node_id: i64,
    name: String,
    file_type: String,
    file_size: i64,
    chunk_hashes: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

impl TryFrom<FileDetailsRow> for FileDetails {
    type Error = crate::SkyvaultError;

    fn try_from(row: FileDetailsRow) -> Result<Self> {
        Ok(Self {
            node_id: row.node_id,
            name: row.name,
            file_type: row.file_type,
            file_size: row.file_size,
            chunk_hashes: serde_json::from_str(&row.chunk_hashes)?,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
            last_modified_at: row.last_modified_at,
        })
    }
}

/// Repository for file metadata operations.
pub struct FileMetadataRepository;

impl FileMetadataRepository {
    /// Insert a metadata row for a file node.
    pub async fn create<'e, E>(executor: E, metadata: &NewFileMetadata) -> Result<FileMetadata>
    where
        E: SqliteExecutor<'e>,
    {
        let hashes = serde_json::to_string(&metadata.chunk_hashes)?;

        let row = sqlx::query_as::<_, FileMetadataRow>(
            "INSERT INTO file_metadata (file_type, file_size, chunk_hashes, node_id)
             VALUES (?, ?, ?, ?)
             RETURNING id, file_type, file_size, chunk_hashes, node_id",
        )
        .bind(&metadata.file_type)
        .bind(metadata.file_size)
        .bind(hashes)
        .bind(metadata.node_id)
        .fetch_one(executor)
        .await?;

        row.try_into()
    }

    /// Get the metadata row owned by a node.
    pub async fn get_by_node<'e, E>(executor: E, node_id: i64) -> Result<Option<FileMetadata>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, FileMetadataRow>(
            "SELECT id, file_type, file_size, chunk_hashes, node_id
             FROM file_metadata WHERE node_id = ?",
        )
        .bind(node_id)
        .fetch_optional(executor)
        .await?;

        row.map(FileMetadata::try_from).transpose()
    }

    /// Get a file node together with its metadata.
    ///
    /// Returns `None` for folders and unknown IDs.
    pub async fn get_details<'e, E>(executor: E, node_id: i64) -> Result<Option<FileDetails>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, FileDetailsRow>(
            "SELECT n.id AS node_id, n.name, m.file_type, m.file_size, m.chunk_hashes,
                    n.created_at, n.last_accessed_at, n.last_modified_at
             FROM nodes n
             JOIN file_metadata m ON m.node_id = n.id
             WHERE n.id = ?",
        )
        .bind(node_id)
        .fetch_optional(executor)
        .await?;

        row.map(FileDetails::try_from).transpose()
    }

    /// Delete the metadata row owned by a node.
    pub async fn delete_by_node<'e, E>(executor: E, node_id: i64) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM file_metadata WHERE node_id = ?")
            .bind(node_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all metadata rows.
    pub async fn count<'e, E>(executor: E) -> Result<i64>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_metadata")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}
