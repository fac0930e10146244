//! Error types for SkyVault.

use thiserror::Error;

/// Stable classification of a [`SkyvaultError`].
///
/// Callers branch on the kind rather than on the message, which is free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidName,
    PathSegmentConflict,
    StoreUnavailable,
    PartialFailure,
    InvalidRequest,
    Config,
}

impl ErrorKind {
    /// Get the kind as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidName => "invalid_name",
            ErrorKind::PathSegmentConflict => "path_segment_conflict",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::PartialFailure => "partial_failure",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Config => "config",
        }
    }

    /// Whether the error was caused by the request rather than the stores.
    ///
    /// Client errors are surfaced as-is and must not be retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound
                | ErrorKind::InvalidName
                | ErrorKind::PathSegmentConflict
                | ErrorKind::InvalidRequest
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common error type for SkyVault.
#[derive(Error, Debug)]
pub enum SkyvaultError {
    /// Requested node, metadata row or chunk is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// File name is unusable (no extension, or contains a separator).
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A path segment exists under its parent but as a file, not a folder
    /// (or a file name collides with an existing folder).
    #[error("path segment '{segment}' under node {parent_id} exists with the wrong node kind")]
    PathSegmentConflict { segment: String, parent_id: i64 },

    /// The relational store or the chunk store failed.
    ///
    /// sqlx errors are converted into this variant automatically.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A multi-step operation failed after committing some of its steps.
    #[error("{operation} failed after {committed} committed step(s): {source}")]
    PartialFailure {
        operation: &'static str,
        committed: usize,
        #[source]
        source: Box<SkyvaultError>,
    },

    /// Request is malformed (empty chunk list, negative size, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error from the chunk backend or log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SkyvaultError {
    /// Get the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkyvaultError::NotFound(_) => ErrorKind::NotFound,
            SkyvaultError::InvalidName(_) => ErrorKind::InvalidName,
            SkyvaultError::PathSegmentConflict { .. } => ErrorKind::PathSegmentConflict,
            SkyvaultError::StoreUnavailable(_) | SkyvaultError::Io(_) => {
                ErrorKind::StoreUnavailable
            }
            SkyvaultError::PartialFailure { .. } => ErrorKind::PartialFailure,
            SkyvaultError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SkyvaultError::Config(_) => ErrorKind::Config,
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for SkyvaultError {
    fn from(e: sqlx::Error) -> Self {
        SkyvaultError::StoreUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for SkyvaultError {
    fn from(e: serde_json::Error) -> Self {
        SkyvaultError::StoreUnavailable(format!("corrupt chunk hash list: {e}"))
    }
}

/// Result type alias for SkyVault operations.
pub type Result<T> = std::result::Result<T, SkyvaultError>;
