//! HTTP route handlers.
//!
//! - `health`: liveness probe and the Prometheus scrape endpoint
//! - `convert`: the DOCX→PDF upload handler

pub mod convert;
pub mod health;

use crate::error::ApiError;

/// 404 fallback for undefined routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
