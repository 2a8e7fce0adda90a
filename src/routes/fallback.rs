//! Generic 404 handler.

use crate::error::{AppError, ErrorKind, ErrorResponse};
use axum::Json;
use http::StatusCode;

/// 404 fallback for unmatched paths.
pub async fn notfound_404() -> (StatusCode, Json<ErrorResponse>) {
    AppError::new(
        StatusCode::NOT_FOUND,
        ErrorKind::NotFound,
        Some("No such route"),
    )
    .into()
}
