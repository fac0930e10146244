//! Parent-scoped resolution of folder paths.

use tracing::debug;

use super::{path_segments, NodeRepository};
use crate::db::DbPool;
use crate::{Result, SkyvaultError};

/// Outcome of resolving a folder path against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Deepest existing folder on the path (the root if nothing matched).
    pub folder_id: i64,
    /// Segments below `folder_id` that do not exist yet, in order.
    pub remaining: Vec<String>,
}

impl Resolution {
    /// Whether the whole path already exists.
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Walks a slash-delimited folder path from the root.
///
/// Each segment is looked up among the children of the folder matched so
/// far, so `docs/notes` and `archive/notes` are distinct folders.
pub struct PathResolver<'a> {
    pool: &'a DbPool,
    root_id: i64,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver rooted at `root_id`.
    pub fn new(pool: &'a DbPool, root_id: i64) -> Self {
        Self { pool, root_id }
    }

    /// Resolve `path` to its deepest existing folder and the missing suffix.
    ///
    /// Fails with `PathSegmentConflict` if a segment names a file.
    pub async fn resolve(&self, path: &str) -> Result<Resolution> {
        let segments = path_segments(path);
        let mut folder_id = self.root_id;

        for (depth, segment) in segments.iter().enumerate() {
            match NodeRepository::find_child(self.pool, folder_id, segment).await? {
                Some(node) if node.is_folder => folder_id = node.id,
                Some(_) => {
                    return Err(SkyvaultError::PathSegmentConflict {
                        segment: segment.to_string(),
                        parent_id: folder_id,
                    });
                }
                None => {
                    let remaining: Vec<String> =
                        segments[depth..].iter().map(|s| s.to_string()).collect();
                    debug!(
                        "Resolved '{}' to folder {} with {} missing segment(s)",
                        path,
                        folder_id,
                        remaining.len()
                    );
                    return Ok(Resolution {
                        folder_id,
                        remaining,
                    });
                }
            }
        }

        Ok(Resolution {
            folder_id,
            remaining: Vec::new(),
        })
    }
}
