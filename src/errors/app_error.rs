//! Error type for the REST handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the REST surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request body failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// An upstream collaborator call failed.
    #[error("{0}")]
    UpstreamFailure(String),
}

/// Convenience result for REST handlers.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
