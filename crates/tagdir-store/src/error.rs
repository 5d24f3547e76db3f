//! Error types for the tag store.

use thiserror::Error;

/// Errors that can occur when reading or writing tag records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A unique constraint was violated at the storage layer.
    #[error("duplicate key: {field}")]
    DuplicateKey { field: String },

    /// The keyword filter is not a valid regular expression.
    #[error("invalid keyword pattern: {0}")]
    InvalidPattern(String),
}

/// Failure while computing tag usage counts.
///
/// Kept apart from [`StoreError`]: callers degrade to zero counts on this
/// error instead of failing the read.
#[derive(Debug, Error)]
#[error("count aggregation failed: {0}")]
pub struct AggregationError(#[from] pub rusqlite::Error);
