//! Error codes and JSON error bodies.
//!
//! DESIGN
//! ======
//! Every service owns a `thiserror` enum. Those enums implement `ErrorCode`
//! so route handlers can pair an HTTP status with a stable, grepable code.
//! The presentation layer only ever sees `{"code": ..., "message": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Stable machine-readable code for an error variant (e.g. `E_NOT_FOUND`).
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// HTTP error response carrying a status, an error code, and a message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new<E>(status: StatusCode, err: &E) -> Self
    where
        E: ErrorCode + std::fmt::Display,
    {
        Self { status, code: err.error_code(), message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "code": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
