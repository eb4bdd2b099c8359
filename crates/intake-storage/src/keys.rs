//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{scope}/{uuid}{ext}`.

use crate::traits::{StorageError, StorageResult};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_KEY_PREFIX: &str = "sessions";

/// Lowercased extension of `name` including the leading dot, or empty.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Generate a storage key for `name` within `scope`.
///
/// The scope must be a single path segment; anything that could climb out of
/// the prefix is rejected.
pub fn generate_storage_key(prefix: &str, scope: &str, name: &str) -> StorageResult<String> {
    let scope = scope.trim();
    if scope.is_empty()
        || scope.contains('/')
        || scope.contains('\\')
        || scope.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "invalid storage scope '{}'",
            scope
        )));
    }

    let prefix = prefix.trim_matches('/');
    let file = format!("{}{}", Uuid::new_v4().simple(), extension_of(name));

    if prefix.is_empty() {
        Ok(format!("{}/{}", scope, file))
    } else {
        Ok(format!("{}/{}/{}", prefix, scope, file))
    }
}

/// Last path component of a key.
pub fn stored_name(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Reject payloads above the relay ceiling before touching the backend.
pub fn check_size(size: usize, max: usize) -> StorageResult<()> {
    if size > max {
        return Err(StorageError::TooLarge { size, max });
    }
    Ok(())
}
