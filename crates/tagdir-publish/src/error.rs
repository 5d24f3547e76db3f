//! Error types for the publishing collaborators.

use thiserror::Error;

use tagdir_store::StoreError;

/// Errors raised while publishing a sitemap or pushing URLs.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Writing the sitemap failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The search endpoint answered with a non-success status.
    #[error("push rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Reading tags for the sitemap failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Blocking task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}
