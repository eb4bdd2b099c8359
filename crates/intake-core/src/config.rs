//! Configuration module
//!
//! Environment-driven configuration for the ingestion service: server, database,
//! object storage, upload and archive limits, external model endpoints, OCR and
//! chunking settings. `.env` files are honoured through `dotenvy`.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 20;
const MAX_REQUEST_BODY_MB: usize = 100;
const STORAGE_MAX_OBJECT_SIZE_MB: usize = 50;
const ARCHIVE_MAX_ENTRIES: usize = 500;
const ARCHIVE_MAX_MEMBER_SIZE_MB: usize = 50;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "pdf,docx,png,jpg,jpeg,tif,tiff,bmp,webp";
const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "application/pdf,\
application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
image/png,image/jpeg,image/tiff,image/bmp,image/webp";
const DEFAULT_STORAGE_KEY_PREFIX: &str = "sessions";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const EMBEDDING_DIM: usize = 1536;
const EMBEDDING_BATCH_SIZE: usize = 64;
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_OCR_LANGUAGES: &str = "eng+rus";
const PDF_OCR_MAX_PAGES: usize = 5;
const CHUNK_SIZE: usize = 1000;
const CHUNK_OVERLAP: usize = 150;

const MB: usize = 1024 * 1024;

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_public_base_url: Option<String>,
    pub storage_key_prefix: String,
    pub storage_max_object_size_bytes: usize,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload limits
    pub max_upload_size_bytes: usize,
    pub max_request_body_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Archive limits
    pub archive_max_entries: usize,
    pub archive_max_member_size_bytes: usize,
    pub unar_path: String,
    // Classification and structured extraction (OpenAI-compatible)
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    // Embeddings
    pub embedding_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub embedding_batch_size: usize,
    pub http_client_timeout_secs: u64,
    // Text extraction and chunking
    pub ocr_languages: String,
    pub pdf_ocr_max_pages: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    // Optional structured-record export sink
    pub export_url: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestConfig>);

impl Config {
    fn as_ingest(&self) -> &IngestConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingest().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_ingest().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.as_ingest().base.environment
    }

    pub fn server_port(&self) -> u16 {
        self.as_ingest().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_ingest().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingest().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingest().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.as_ingest().database_url
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_ingest().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_ingest().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_ingest().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_ingest().s3_endpoint.as_deref()
    }

    pub fn s3_public_base_url(&self) -> Option<&str> {
        self.as_ingest().s3_public_base_url.as_deref()
    }

    pub fn storage_key_prefix(&self) -> &str {
        &self.as_ingest().storage_key_prefix
    }

    pub fn storage_max_object_size_bytes(&self) -> usize {
        self.as_ingest().storage_max_object_size_bytes
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_ingest().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_ingest().local_storage_base_url.as_deref()
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_ingest().max_upload_size_bytes
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.as_ingest().max_request_body_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_ingest().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_ingest().allowed_content_types
    }

    pub fn archive_max_entries(&self) -> usize {
        self.as_ingest().archive_max_entries
    }

    pub fn archive_max_member_size_bytes(&self) -> usize {
        self.as_ingest().archive_max_member_size_bytes
    }

    pub fn unar_path(&self) -> &str {
        &self.as_ingest().unar_path
    }

    pub fn llm_base_url(&self) -> &str {
        &self.as_ingest().llm_base_url
    }

    pub fn llm_api_key(&self) -> Option<&str> {
        self.as_ingest().llm_api_key.as_deref()
    }

    pub fn llm_model(&self) -> &str {
        &self.as_ingest().llm_model
    }

    pub fn embedding_base_url(&self) -> &str {
        &self.as_ingest().embedding_base_url
    }

    pub fn embedding_api_key(&self) -> Option<&str> {
        self.as_ingest().embedding_api_key.as_deref()
    }

    pub fn embedding_model(&self) -> &str {
        &self.as_ingest().embedding_model
    }

    pub fn embedding_dim(&self) -> usize {
        self.as_ingest().embedding_dim
    }

    pub fn embedding_batch_size(&self) -> usize {
        self.as_ingest().embedding_batch_size
    }

    pub fn http_client_timeout_secs(&self) -> u64 {
        self.as_ingest().http_client_timeout_secs
    }

    pub fn ocr_languages(&self) -> &str {
        &self.as_ingest().ocr_languages
    }

    pub fn pdf_ocr_max_pages(&self) -> usize {
        self.as_ingest().pdf_ocr_max_pages
    }

    pub fn chunk_size(&self) -> usize {
        self.as_ingest().chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.as_ingest().chunk_overlap
    }

    pub fn export_url(&self) -> Option<&str> {
        self.as_ingest().export_url.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config(Box::default())
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            base: BaseConfig::default(),
            database_url: String::new(),
            storage_backend: StorageBackend::S3,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_public_base_url: None,
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            storage_max_object_size_bytes: STORAGE_MAX_OBJECT_SIZE_MB * MB,
            local_storage_path: None,
            local_storage_base_url: None,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * MB,
            max_request_body_bytes: MAX_REQUEST_BODY_MB * MB,
            allowed_extensions: parse_list(DEFAULT_ALLOWED_EXTENSIONS),
            allowed_content_types: parse_list(DEFAULT_ALLOWED_CONTENT_TYPES),
            archive_max_entries: ARCHIVE_MAX_ENTRIES,
            archive_max_member_size_bytes: ARCHIVE_MAX_MEMBER_SIZE_MB * MB,
            unar_path: "unar".to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embedding_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            embedding_api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dim: EMBEDDING_DIM,
            embedding_batch_size: EMBEDDING_BATCH_SIZE,
            http_client_timeout_secs: HTTP_CLIENT_TIMEOUT_SECS,
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            pdf_ocr_max_pages: PDF_OCR_MAX_PAGES,
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            export_url: None,
        }
    }
}

/// Split a comma-separated list, trimming and lowercasing entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read an optional variable, treating empty values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parsed_var("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match optional_var("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::S3,
        };

        let llm_base_url =
            env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        let llm_api_key = optional_var("LLM_API_KEY");

        Ok(IngestConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            s3_bucket: optional_var("S3_BUCKET"),
            s3_region: optional_var("S3_REGION").or_else(|| optional_var("AWS_REGION")),
            s3_endpoint: optional_var("S3_ENDPOINT"),
            s3_public_base_url: optional_var("S3_PUBLIC_BASE_URL"),
            storage_key_prefix: env::var("S3_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_STORAGE_KEY_PREFIX.to_string()),
            storage_max_object_size_bytes: parsed_var(
                "STORAGE_MAX_OBJECT_SIZE_MB",
                STORAGE_MAX_OBJECT_SIZE_MB,
            ) * MB,
            local_storage_path: optional_var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional_var("LOCAL_STORAGE_BASE_URL"),
            max_upload_size_bytes: parsed_var("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB) * MB,
            max_request_body_bytes: parsed_var("MAX_REQUEST_BODY_MB", MAX_REQUEST_BODY_MB) * MB,
            allowed_extensions: parse_list(
                &env::var("ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
            )
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect(),
            allowed_content_types: parse_list(
                &env::var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_CONTENT_TYPES.to_string()),
            ),
            archive_max_entries: parsed_var("ARCHIVE_MAX_ENTRIES", ARCHIVE_MAX_ENTRIES),
            archive_max_member_size_bytes: parsed_var(
                "ARCHIVE_MAX_MEMBER_SIZE_MB",
                ARCHIVE_MAX_MEMBER_SIZE_MB,
            ) * MB,
            unar_path: env::var("UNAR_PATH").unwrap_or_else(|_| "unar".to_string()),
            embedding_base_url: env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| llm_base_url.clone()),
            embedding_api_key: optional_var("EMBEDDING_API_KEY").or_else(|| llm_api_key.clone()),
            llm_base_url,
            llm_api_key,
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dim: parsed_var("EMBEDDING_DIM", EMBEDDING_DIM),
            embedding_batch_size: parsed_var("EMBEDDING_BATCH_SIZE", EMBEDDING_BATCH_SIZE),
            http_client_timeout_secs: parsed_var(
                "HTTP_CLIENT_TIMEOUT_SECS",
                HTTP_CLIENT_TIMEOUT_SECS,
            ),
            ocr_languages: env::var("OCR_LANGUAGES")
                .unwrap_or_else(|_| DEFAULT_OCR_LANGUAGES.to_string()),
            pdf_ocr_max_pages: parsed_var("PDF_OCR_MAX_PAGES", PDF_OCR_MAX_PAGES),
            chunk_size: parsed_var("CHUNK_SIZE", CHUNK_SIZE),
            chunk_overlap: parsed_var("CHUNK_OVERLAP", CHUNK_OVERLAP),
            export_url: optional_var("EXPORT_URL"),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.llm_api_key.is_none() {
            return Err(anyhow::anyhow!(
                "LLM_API_KEY must be set for classification and structured extraction"
            ));
        }

        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(anyhow::anyhow!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }

        if self.embedding_dim == 0 || self.embedding_batch_size == 0 {
            return Err(anyhow::anyhow!(
                "EMBEDDING_DIM and EMBEDDING_BATCH_SIZE must be greater than zero"
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }

        Ok(())
    }
}
