//! Intake API Library
//!
//! This crate provides the HTTP surface (`POST /upload`, health probes, OpenAPI),
//! the ingestion pipeline and batch coordinator, and application setup.
//!
//! # Features
//!
//! The default build handles text PDFs and DOCX files only. OCR of scanned
//! PDFs and images needs the native Tesseract and pdfium libraries and is
//! enabled with `--features full` (or `tesseract` and `pdfium` separately).

// Module declarations
mod api_doc;
mod handlers;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod error;
pub mod services;
pub mod session;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::ingest::{BatchCoordinator, Collaborators, IngestPipeline};
pub use session::SessionContext;
pub use state::{AppState, UploadLimits};
pub use utils::upload::UploadedFile;
