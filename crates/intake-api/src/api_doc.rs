//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use intake_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Intake API",
        version = "0.1.0",
        description = "Document ingestion: upload PDFs, DOCX files, scanned images or archives of them. Each document is stored, classified, structured, chunked and embedded."
    ),
    paths(
        handlers::upload::upload,
        handlers::health::liveness_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::BatchResult,
        models::IngestResult,
        models::IngestedDocument,
        models::IngestFailure,
        models::Classification,
        models::DocumentType,
        models::StructuredRecord,
        models::DocumentFields,
    )),
    tags(
        (name = "upload", description = "Document ingestion"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
