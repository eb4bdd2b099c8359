use crate::error::{ErrorResponse, HttpAppError};
use crate::session::SessionContext;
use crate::state::AppState;
use crate::utils::upload::{read_uploads, validate_document_upload};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use intake_core::BatchResult;
use std::sync::Arc;
use std::time::Instant;

/// Ingest uploaded documents and archives of documents.
///
/// The whole request is rejected before any processing when no file is sent,
/// a file is too large, or a non-archive file is outside the allow-list.
/// Per-item failures are reported inside the `201` body.
///
/// Scanned PDFs and images are only read when the server is built with the
/// `full` feature (Tesseract OCR and pdfium rasterization). Without it those
/// documents are still stored and classified from their URL, but yield no
/// text and no chunks.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    params(
        ("X-Session-Id" = Option<String>, Header, description = "Session scope for stored objects; generated when absent"),
        ("X-User-Id" = Option<String>, Header, description = "User the upload is attributed to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Upload processed; inspect each entry for an error key", body = BatchResult),
        (status = 400, description = "No files provided", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(session_id = %session.session_id, user_id = %session.user_id))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BatchResult>), HttpAppError> {
    let start = Instant::now();
    let uploads = read_uploads(multipart, state.upload.max_file_size).await?;

    for upload in &uploads {
        if state.coordinator.archive_format(upload).is_none() {
            validate_document_upload(upload, &state.upload)?;
        }
    }

    let file_count = uploads.len();
    let batch = state.coordinator.process(uploads, &session).await;

    tracing::info!(
        uploads = file_count,
        results = batch.len(),
        errors = batch.error_count(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Upload batch processed"
    );

    Ok((StatusCode::CREATED, Json(batch)))
}
