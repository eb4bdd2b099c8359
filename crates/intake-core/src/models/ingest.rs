use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::document::{Classification, StructuredRecord};

/// Identity of the uploaded archive an item was expanded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub id: Uuid,
    pub name: String,
}

impl PackageRef {
    /// A fresh package identity for one archive instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// One document submitted to the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestItem {
    pub name: String,
    pub data: Bytes,
    pub content_type: String,
    /// Set only when the item came from archive expansion.
    pub package: Option<PackageRef>,
    pub session_id: String,
    pub user_id: String,
}

impl IngestItem {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Successful ingestion of one item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestedDocument {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Classification result
    pub metadata1: Classification,
    /// Structured fields for the classified document type
    pub metadata2: StructuredRecord,
    /// Number of chunks embedded and persisted
    pub chunks: usize,
}

/// Failed ingestion of one item, or of a whole archive keyed by its upload name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestFailure {
    pub name: String,
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

/// Exactly one result per ingested item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum IngestResult {
    Failure(IngestFailure),
    Success(Box<IngestedDocument>),
}

impl IngestResult {
    pub fn name(&self) -> &str {
        match self {
            IngestResult::Success(doc) => &doc.name,
            IngestResult::Failure(failure) => &failure.name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, IngestResult::Failure(_))
    }

    pub fn package_id(&self) -> Option<Uuid> {
        match self {
            IngestResult::Success(doc) => doc.package_id,
            IngestResult::Failure(failure) => failure.package_id,
        }
    }
}

impl From<IngestedDocument> for IngestResult {
    fn from(doc: IngestedDocument) -> Self {
        IngestResult::Success(Box::new(doc))
    }
}

impl From<IngestFailure> for IngestResult {
    fn from(failure: IngestFailure) -> Self {
        IngestResult::Failure(failure)
    }
}

/// Response body of `POST /upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    pub files: Vec<IngestResult>,
}

impl BatchResult {
    pub fn push(&mut self, result: impl Into<IngestResult>) {
        self.files.push(result.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().filter(|r| r.is_error()).count()
    }
}
