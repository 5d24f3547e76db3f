//! Error types for the HTTP API.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tagdir_directory::DirectoryError;
use thiserror::Error;
use tracing::error;

use crate::response::failure;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum WebError {
    /// The caller is not allowed to write tags.
    #[error("unauthorized")]
    Unauthorized,

    /// The request could not be parsed.
    #[error("{message}")]
    Malformed { status: StatusCode, message: String },

    /// Directory operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebError::Malformed { status, .. } => *status,
            WebError::Directory(DirectoryError::Validation(_)) => StatusCode::BAD_REQUEST,
            WebError::Directory(DirectoryError::Conflict(_)) => StatusCode::CONFLICT,
            WebError::Directory(DirectoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            WebError::Directory(DirectoryError::Store(_) | DirectoryError::Task(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Details stay in the log.
            error!(error = %self, "request failed");
            return failure(status, "internal error");
        }
        failure(status, &self.to_string())
    }
}

macro_rules! malformed_from {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for WebError {
                fn from(rejection: $rejection) -> Self {
                    WebError::Malformed {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

malformed_from!(QueryRejection, JsonRejection, PathRejection);
