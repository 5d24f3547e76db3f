//! Error types for the tag directory.

use tagdir_store::{StoreError, TagId};
use thiserror::Error;

/// Errors surfaced by list and mutation operations.
///
/// Count aggregation failures never appear here: they degrade counts to zero.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The slug is already owned by another tag.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No tag has this id.
    #[error("tag not found: {0}")]
    NotFound(TagId),

    /// Storage failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A blocking computation panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPattern(msg) => DirectoryError::Validation(msg),
            StoreError::DuplicateKey { field } => {
                DirectoryError::Conflict(format!("{field} already exists"))
            }
            other => DirectoryError::Store(other),
        }
    }
}

impl From<tokio::task::JoinError> for DirectoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        DirectoryError::Task(err.to_string())
    }
}
