//! Application state shared by handlers.

use intake_core::Config;
use sqlx::PgPool;

use crate::services::ingest::BatchCoordinator;

/// Request-level upload policy: per-file ceiling and top-level allow-lists.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub max_request_body: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size: config.max_upload_size_bytes(),
            max_request_body: config.max_request_body_bytes(),
            allowed_extensions: config.allowed_extensions().to_vec(),
            allowed_content_types: config.allowed_content_types().to_vec(),
        }
    }
}

/// Main application state
pub struct AppState {
    pub config: Config,
    /// Used by the readiness probe; repositories hold their own handle.
    pub pool: PgPool,
    pub upload: UploadLimits,
    pub coordinator: BatchCoordinator,
}
