//! Error types module
//!
//! All failures of the ingestion service are unified under [`AppError`]. Variants are
//! grouped the way the upload endpoint reports them:
//!
//! - request-rejecting errors (`BadRequest`, `UnsupportedMediaType`, `PayloadTooLarge`)
//!   abort the whole request with a 4xx status;
//! - archive-level errors (`UnsupportedFormat`, `ArchiveTooLarge`, `CorruptArchive`)
//!   abort the expansion of one uploaded archive;
//! - item-level errors (storage, extraction, classification, persistence) abort one
//!   document and are reported inside the batch response.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage upload failed: {0}")]
    StorageUploadFailed(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive contains more than {max} entries")]
    ArchiveTooLarge { max: usize },

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("{service} request failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StorageUploadFailed(_) => (
            502,
            "STORAGE_UPLOAD_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::UnsupportedFormat(_) => (
            415,
            "UNSUPPORTED_ARCHIVE_FORMAT",
            false,
            Some("Upload ZIP, TAR, TAR.GZ, TAR.BZ2, 7Z or RAR archives"),
            false,
            LogLevel::Debug,
        ),
        AppError::ArchiveTooLarge { .. } => (
            413,
            "ARCHIVE_TOO_LARGE",
            false,
            Some("Split the archive into smaller archives"),
            false,
            LogLevel::Warn,
        ),
        AppError::CorruptArchive(_) => (
            422,
            "CORRUPT_ARCHIVE",
            false,
            Some("Check that the archive opens locally and is not password protected"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedContentType(_) => (
            415,
            "UNSUPPORTED_CONTENT_TYPE",
            false,
            Some("Upload PDF, DOCX or image documents"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload PDF, DOCX, image documents or archives of them"),
            false,
            LogLevel::Debug,
        ),
        AppError::ExternalService { .. } => (
            502,
            "EXTERNAL_SERVICE_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        AppError::UnknownDocumentType(_) => (
            502,
            "UNKNOWN_DOCUMENT_TYPE",
            true,
            Some("Retry the upload; the classifier returned an unexpected label"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size or split the upload"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::StorageUploadFailed(_) => "StorageUploadFailed",
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::ArchiveTooLarge { .. } => "ArchiveTooLarge",
            AppError::CorruptArchive(_) => "CorruptArchive",
            AppError::UnsupportedContentType(_) => "UnsupportedContentType",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::ExternalService { .. } => "ExternalService",
            AppError::UnknownDocumentType(_) => "UnknownDocumentType",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::StorageUploadFailed(_) => "Failed to upload file to storage".to_string(),
            AppError::UnsupportedFormat(ref msg) => format!("Unsupported archive format: {}", msg),
            AppError::ArchiveTooLarge { max } => {
                format!("Archive contains more than {} entries", max)
            }
            AppError::CorruptArchive(ref msg) => format!("Corrupt archive: {}", msg),
            AppError::UnsupportedContentType(ref msg) => {
                format!("Unsupported content type: {}", msg)
            }
            AppError::UnsupportedMediaType(ref msg) => msg.clone(),
            AppError::ExternalService { service, message } => {
                format!("{} request failed: {}", service, message)
            }
            AppError::UnknownDocumentType(ref label) => {
                format!("Classifier returned unknown document type '{}'", label)
            }
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
