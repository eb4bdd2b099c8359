//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use intake_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object too large: {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { size, max } => AppError::PayloadTooLarge(format!(
                "{} bytes exceeds the storage limit of {} bytes",
                size, max
            )),
            other => AppError::StorageUploadFailed(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identity of an object written by [`Storage::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Internal key used to address the object
    pub key: String,
    /// Publicly resolvable URL
    pub url: String,
    pub size: u64,
    pub etag: Option<String>,
    /// Final path component of the key
    pub stored_name: String,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Implementations must be safe for concurrent use; keys are random so
/// concurrent writers never contend for the same object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under a fresh key scoped by `scope` (the session id).
    ///
    /// `name` is the original file name; only its extension is kept in the key.
    async fn put(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
        scope: &str,
    ) -> StorageResult<StoredObject>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
