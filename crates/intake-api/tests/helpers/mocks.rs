//! In-memory collaborators standing in for object storage, Postgres and the
//! model endpoints.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use intake_core::{
    AppError, Classification, DocumentFields, DocumentType, StorageBackend, StructuredRecord,
};
use intake_db::{DocumentStore, FileRecord, FileStatus, NewFileRecord};
use intake_processing::{ExtractError, OcrEngine};
use intake_services::{DocumentClassifier, EmbeddingProvider, RecordExporter, StructuredExtractor};
use intake_storage::{Storage, StorageError, StorageResult, StoredObject};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PutCall {
    pub name: String,
    pub key: String,
    pub scope: String,
    pub size: usize,
}

/// Records every write; names listed in `failing` are rejected.
#[derive(Default)]
pub struct MemoryStorage {
    puts: Mutex<Vec<PutCall>>,
    failing: Vec<String>,
}

impl MemoryStorage {
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            puts: Mutex::default(),
            failing: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        name: &str,
        _content_type: &str,
        data: Bytes,
        scope: &str,
    ) -> StorageResult<StoredObject> {
        if self.failing.iter().any(|n| n == name) {
            return Err(StorageError::UploadFailed(format!("bucket refused {}", name)));
        }
        let stored_name = match name.rsplit_once('.') {
            Some((_, ext)) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let key = format!("sessions/{}/{}", scope, stored_name);
        self.puts.lock().unwrap().push(PutCall {
            name: name.to_string(),
            key: key.clone(),
            scope: scope.to_string(),
            size: data.len(),
        });
        Ok(StoredObject {
            url: format!("https://files.test/{}", key),
            key,
            size: data.len() as u64,
            etag: None,
            stored_name,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub record: NewFileRecord,
    pub status: FileStatus,
    pub chunks: usize,
}

/// File rows and chunk counts keyed by id. Chunk inserts fail for file
/// names listed in `failing_chunks`.
#[derive(Default)]
pub struct MemoryDocuments {
    files: Mutex<HashMap<Uuid, StoredFile>>,
    failing_chunks: Vec<String>,
}

impl MemoryDocuments {
    pub fn failing_chunks_for(names: &[&str]) -> Self {
        Self {
            files: Mutex::default(),
            failing_chunks: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.files.lock().unwrap().values().cloned().collect()
    }

    pub fn file(&self, id: Uuid) -> Option<StoredFile> {
        self.files.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn create_file_record(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let row = FileRecord {
            id: record.id,
            file_name: record.file_name.clone(),
            description: record.description.clone(),
            created_by: record.created_by.clone(),
            session_id: record.session_id.clone(),
            file_type: record.file_type.clone(),
            s3_key: record.storage_key.clone(),
            s3_url: record.storage_url.clone(),
            metadata: record.metadata.clone(),
            package_id: record.package_id,
            package_name: record.package_name.clone(),
            status: FileStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.files.lock().unwrap().insert(
            record.id,
            StoredFile {
                record,
                status: FileStatus::Pending,
                chunks: 0,
            },
        );
        Ok(row)
    }

    async fn insert_chunks(
        &self,
        file_id: Uuid,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, AppError> {
        assert_eq!(chunks.len(), embeddings.len());
        let mut files = self.files.lock().unwrap();
        let file = files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::Internal(format!("no file row {}", file_id)))?;
        if self.failing_chunks.contains(&file.record.file_name) {
            return Err(AppError::Internal("chunk insert failed".to_string()));
        }
        file.chunks = chunks.len();
        Ok(chunks.len())
    }

    async fn set_status(&self, file_id: Uuid, status: FileStatus) -> Result<(), AppError> {
        let mut files = self.files.lock().unwrap();
        let file = files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::Internal(format!("no file row {}", file_id)))?;
        file.status = status;
        Ok(())
    }
}

/// Classifies everything as `document_type`. With `reject_images` set, image
/// documents come back with a label outside the known set.
pub struct FixedClassifier {
    pub document_type: DocumentType,
    pub reject_images: bool,
}

impl FixedClassifier {
    pub fn new(document_type: DocumentType) -> Self {
        Self {
            document_type,
            reject_images: false,
        }
    }
}

#[async_trait]
impl DocumentClassifier for FixedClassifier {
    async fn classify(&self, _document_url: &str, is_image: bool) -> Result<Classification, AppError> {
        if self.reject_images && is_image {
            return Err(AppError::UnknownDocumentType("Receipt".to_string()));
        }
        Ok(Classification {
            document_type: self.document_type,
        })
    }
}

pub fn sample_fields() -> DocumentFields {
    DocumentFields {
        number: 1042,
        date: "2024-03-15".to_string(),
        organization: "Northwind Trading".to_string(),
        amount: 125_000,
    }
}

pub struct FieldsExtractor;

#[async_trait]
impl StructuredExtractor for FieldsExtractor {
    async fn extract(
        &self,
        _document_url: &str,
        _is_image: bool,
        document_type: DocumentType,
    ) -> Result<StructuredRecord, AppError> {
        Ok(StructuredRecord::from_fields(document_type, sample_fields()))
    }
}

/// Deterministic vectors of a fixed dimension.
pub struct FakeEmbeddings {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32; self.dimension])
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingExporter {
    records: Mutex<Vec<StructuredRecord>>,
    pub fail: bool,
}

impl RecordingExporter {
    pub fn failing() -> Self {
        Self {
            records: Mutex::default(),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<StructuredRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordExporter for RecordingExporter {
    async fn export(&self, record: &StructuredRecord) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::ExternalService {
                service: "export",
                message: "status 502".to_string(),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// OCR that reads the same text off every page.
pub struct FixedOcr(pub &'static str);

impl OcrEngine for FixedOcr {
    fn recognize(&self, _image: &image::GrayImage) -> Result<String, ExtractError> {
        Ok(self.0.to_string())
    }
}
