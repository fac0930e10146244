//! Idempotent creation of folder chains and file entries.

use tracing::{debug, info};

use super::{
    file_type, FileMetadataRepository, NewFileMetadata, NewNode, NodeRepository, PathResolver,
};
use crate::db::Database;
use crate::{Result, SkyvaultError};

/// A request to save a folder path, or a file inside a folder path.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Whether the request materializes a folder only.
    pub is_folder: bool,
    /// Slash-delimited folder path (file name excluded).
    pub folder_path: String,
    /// File name, required for files.
    pub file_name: Option<String>,
    /// File size in bytes, required for files.
    pub file_size: Option<i64>,
    /// Chunk hashes in file order, required for files.
    pub chunk_hashes: Vec<String>,
}

impl SaveRequest {
    /// Save (or resolve) a folder path.
    pub fn folder(folder_path: impl Into<String>) -> Self {
        Self {
            is_folder: true,
            folder_path: folder_path.into(),
            file_name: None,
            file_size: None,
            chunk_hashes: Vec::new(),
        }
    }

    /// Save a file under a folder path.
    pub fn file(
        folder_path: impl Into<String>,
        file_name: impl Into<String>,
        file_size: i64,
        chunk_hashes: Vec<String>,
    ) -> Self {
        Self {
            is_folder: false,
            folder_path: folder_path.into(),
            file_name: Some(file_name.into()),
            file_size: Some(file_size),
            chunk_hashes,
        }
    }
}

/// Validated file part of a save request.
struct FileEntry<'r> {
    name: &'r str,
    file_type: String,
    file_size: i64,
    chunk_hashes: &'r [String],
}

/// Materializes folder chains and attaches file nodes.
pub struct TreeMutator<'a> {
    db: &'a Database,
    root_id: i64,
}

impl<'a> TreeMutator<'a> {
    /// Create a mutator over the tree rooted at `root_id`.
    pub fn new(db: &'a Database, root_id: i64) -> Self {
        Self { db, root_id }
    }

    /// Save a folder path or a file and return the resulting node ID.
    ///
    /// For folders this is the ID of the last folder on the path, created
    /// or not. For files it is the ID of the new file node. Saving a file
    /// over an existing file of the same name replaces it.
    pub async fn save(&self, request: &SaveRequest) -> Result<i64> {
        // Validate before touching the store so a bad file leaves no folders.
        let entry = if request.is_folder {
            None
        } else {
            Some(Self::validate_file(request)?)
        };

        let (folder_id, created) = self.materialize(&request.folder_path).await?;

        let Some(entry) = entry else {
            return Ok(folder_id);
        };

        match self.attach_file(folder_id, &entry).await {
            Ok(id) => Ok(id),
            Err(e) if created == 0 => Err(e),
            // The folders stay behind; the file and its metadata were rolled back.
            Err(e) => Err(SkyvaultError::PartialFailure {
                operation: "file save",
                committed: created,
                source: Box::new(e),
            }),
        }
    }

    fn validate_file(request: &SaveRequest) -> Result<FileEntry<'_>> {
        let name = request
            .file_name
            .as_deref()
            .ok_or_else(|| SkyvaultError::InvalidRequest("file name is required".to_string()))?;
        let file_type = file_type(name)?;

        let file_size = request
            .file_size
            .ok_or_else(|| SkyvaultError::InvalidRequest("file size is required".to_string()))?;
        if file_size < 0 {
            return Err(SkyvaultError::InvalidRequest(format!(
                "file size must not be negative (got {file_size})"
            )));
        }

        if request.chunk_hashes.is_empty() {
            return Err(SkyvaultError::InvalidRequest(format!(
                "file '{name}' has no chunk hashes"
            )));
        }
        if request.chunk_hashes.iter().any(|h| h.is_empty()) {
            return Err(SkyvaultError::InvalidRequest(format!(
                "file '{name}' has an empty chunk hash"
            )));
        }

        Ok(FileEntry {
            name,
            file_type,
            file_size,
            chunk_hashes: &request.chunk_hashes,
        })
    }

    /// Resolve `folder_path` and create whatever is missing below the
    /// deepest existing folder. Returns the target folder ID and the number
    /// of folders created.
    async fn materialize(&self, folder_path: &str) -> Result<(i64, usize)> {
        let resolution = PathResolver::new(self.db.pool(), self.root_id)
            .resolve(folder_path)
            .await?;

        let mut current = resolution.folder_id;
        let mut created = 0;

        for segment in &resolution.remaining {
            match self.create_folder(current, segment).await {
                Ok((id, inserted)) => {
                    current = id;
                    if inserted {
                        created += 1;
                    }
                }
                Err(e) if created == 0 => return Err(e),
                Err(e) => {
                    return Err(SkyvaultError::PartialFailure {
                        operation: "folder chain creation",
                        committed: created,
                        source: Box::new(e),
                    });
                }
            }
        }

        if created > 0 {
            info!("Created {} folder(s) for path '{}'", created, folder_path);
        }

        Ok((current, created))
    }

    /// Create one folder under `parent_id`, adopting a folder of the same
    /// name if another save created it first.
    async fn create_folder(&self, parent_id: i64, name: &str) -> Result<(i64, bool)> {
        let pool = self.db.pool();
        let inserted = NodeRepository::create_folder_if_absent(pool, parent_id, name).await?;

        let node = NodeRepository::find_child(pool, parent_id, name)
            .await?
            .ok_or_else(|| SkyvaultError::NotFound(format!("folder '{name}' under {parent_id}")))?;

        if !node.is_folder {
            return Err(SkyvaultError::PathSegmentConflict {
                segment: name.to_string(),
                parent_id,
            });
        }

        if !inserted {
            debug!("Folder '{}' under {} already existed", name, parent_id);
        }

        Ok((node.id, inserted))
    }

    /// Insert the file node and its metadata in one transaction.
    async fn attach_file(&self, folder_id: i64, entry: &FileEntry<'_>) -> Result<i64> {
        let mut tx = self.db.begin().await?;

        if let Some(existing) = NodeRepository::find_child(&mut *tx, folder_id, entry.name).await? {
            if existing.is_folder {
                return Err(SkyvaultError::PathSegmentConflict {
                    segment: entry.name.to_string(),
                    parent_id: folder_id,
                });
            }
            FileMetadataRepository::delete_by_node(&mut *tx, existing.id).await?;
            NodeRepository::delete(&mut *tx, existing.id).await?;
            debug!("Replacing file '{}' (node {})", entry.name, existing.id);
        }

        let node =
            NodeRepository::create(&mut *tx, &NewNode::file(entry.name).with_parent(folder_id))
                .await?;

        FileMetadataRepository::create(
            &mut *tx,
            &NewFileMetadata {
                file_type: entry.file_type.clone(),
                file_size: entry.file_size,
                chunk_hashes: entry.chunk_hashes.to_vec(),
                node_id: node.id,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "Saved file '{}' as node {} ({} bytes, {} chunk(s))",
            entry.name,
            node.id,
            entry.file_size,
            entry.chunk_hashes.len()
        );
        Ok(node.id)
    }
}
