//! Intake Storage Library
//!
//! Object storage for uploaded documents, with S3 and local filesystem backends
//! behind the [`Storage`] trait.
//!
//! # Storage key format
//!
//! Keys are scoped by session: `{prefix}/{scope}/{uuid}{ext}`, where `prefix`
//! defaults to `sessions`. The random component keeps concurrent uploads of the
//! same file name from colliding. Key generation is centralized in the `keys`
//! module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use intake_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
