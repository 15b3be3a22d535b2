//! Client-facing error taxonomy for the HTTP surface.
//!
//! Every variant carries a short static message; internal detail (paths,
//! subprocess output) stays in the structured log via the request context's
//! log-error field and never reaches a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors rendered to clients as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("file too large")]
    TooLarge,

    #[error("missing file field")]
    MissingFile,

    #[error("unsupported file type")]
    UnsupportedMediaType,

    #[error("conversion timed out")]
    Timeout,

    #[error("conversion failed")]
    ConversionFailed,

    #[error("conversion produced no output")]
    NoOutput,

    #[error("not found")]
    NotFound,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ConversionFailed | ApiError::NoOutput | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
