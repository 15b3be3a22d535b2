//! The `POST /convert` upload handler.
//!
//! Validates the multipart upload, stages it into a disposable working
//! directory, runs the converter, and streams the PDF back. Every error
//! response is `{"error": "<safe message>"}`; internal detail goes to the
//! request context's log-error field only.

use crate::context::{Outcome, RequestCtx};
use crate::converter::ConvertError;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::Arc;

/// Maximum accepted upload size.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Slack on top of [`MAX_FILE_SIZE`] for the request-body cap, so oversized
/// uploads fail fast instead of being read in full.
pub const BODY_SLACK: usize = 4096;

/// PK ZIP header that all OOXML (.docx) files start with.
const DOCX_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Handle a conversion request. Terminal on the first failing branch.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    ctx: Option<Extension<RequestCtx>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let ctx = ctx.map(|Extension(ctx)| ctx);

    // Any multipart parse failure, including tripping the body cap, is
    // reported as too-large.
    let mut multipart = multipart.map_err(|_| ApiError::TooLarge)?;

    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::TooLarge)?
    {
        if field.name() == Some("file") {
            file_bytes = Some(field.bytes().await.map_err(|_| ApiError::TooLarge)?);
            break;
        }
    }
    let data = file_bytes.ok_or(ApiError::MissingFile)?;

    if data.len() > MAX_FILE_SIZE {
        return Err(ApiError::TooLarge);
    }

    if !has_docx_magic(&data) {
        return Err(ApiError::UnsupportedMediaType);
    }

    // The TempDir guard removes the whole tree, converter profile included,
    // on every exit path below.
    let workdir = tempfile::Builder::new()
        .prefix("docpdf-")
        .tempdir()
        .map_err(|_| ApiError::Internal)?;
    let input_path = workdir.path().join("input.docx");
    tokio::fs::write(&input_path, &data)
        .await
        .map_err(|_| ApiError::Internal)?;

    let pdf_path = match state.converter.convert(&input_path, workdir.path()).await {
        Ok(path) => path,
        Err(ConvertError::Timeout) => {
            if let Some(ctx) = &ctx {
                ctx.set_outcome(Outcome::Timeout);
            }
            return Err(ApiError::Timeout);
        }
        Err(err) => {
            if let Some(ctx) = &ctx {
                ctx.set_log_error(err.to_string());
            }
            return Err(ApiError::ConversionFailed);
        }
    };

    let pdf_data = tokio::fs::read(&pdf_path).await.unwrap_or_default();
    if pdf_data.is_empty() {
        return Err(ApiError::NoOutput);
    }

    if let Some(ctx) = &ctx {
        ctx.set_outcome(Outcome::Success);
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_LENGTH, pdf_data.len().to_string()),
        ],
        pdf_data,
    )
        .into_response())
}

/// Fallback for non-POST methods on the conversion route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// True when `data` begins with the PK ZIP magic bytes.
fn has_docx_magic(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == DOCX_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_accepts_pk_header() {
        assert!(has_docx_magic(&[0x50, 0x4B, 0x03, 0x04, 0xFF]));
    }

    #[test]
    fn magic_rejects_other_prefixes() {
        assert!(!has_docx_magic(b"Hello, plain text"));
        assert!(!has_docx_magic(&[0x50, 0x4B, 0x03]));
        assert!(!has_docx_magic(&[]));
    }
}
