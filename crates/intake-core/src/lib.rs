//! Intake Core Library
//!
//! Domain models, error types and configuration shared by every intake crate.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, IngestConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    BatchResult, Classification, DocumentFields, DocumentType, IngestFailure, IngestItem,
    IngestResult, IngestedDocument, PackageRef, StructuredRecord,
};
pub use storage_types::StorageBackend;
