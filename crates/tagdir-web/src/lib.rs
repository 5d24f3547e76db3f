//! HTTP API for tagdir.
//!
//! Exposes the tag directory as JSON:
//! - `GET /api/tags` lists tags (cached for public callers)
//! - `POST`/`PUT`/`DELETE` under `/api/tags` write tags (authorized only)
//! - `GET /health` for liveness checks

mod auth;
mod error;
mod response;
mod routes;

pub use auth::{Authorizer, BearerToken};
pub use error::WebError;
pub use routes::{AppState, create_router};
