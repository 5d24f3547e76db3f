//! JSON response envelope.
//!
//! Success: `{"code": 1, "message": ..., "result": ...}`.
//! Failure: `{"code": 0, "message": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<'a, T> {
    code: u8,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
}

/// 200 response carrying `result`.
pub fn success<T: Serialize>(message: &str, result: T) -> Response {
    Json(Envelope {
        code: 1,
        message,
        result: Some(result),
    })
    .into_response()
}

/// Error response with the given status.
pub fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Envelope::<()> {
            code: 0,
            message,
            result: None,
        }),
    )
        .into_response()
}
