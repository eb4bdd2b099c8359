use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::AppError;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt;
use uuid::Uuid;

/// Rows per multi-row chunk INSERT.
const CHUNK_INSERT_BATCH: usize = 100;

/// Lifecycle of a file record. Readers only trust `Ready` rows; a `Pending`
/// row left behind means chunk persistence never finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Ready,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Ready => "ready",
            FileStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values for a new `file_objects` row.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub description: Option<String>,
    /// User the upload is attributed to
    pub created_by: String,
    pub session_id: String,
    pub file_type: String,
    pub storage_key: String,
    pub storage_url: String,
    pub metadata: serde_json::Value,
    pub package_id: Option<Uuid>,
    pub package_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub session_id: String,
    pub file_type: String,
    pub s3_key: String,
    pub s3_url: String,
    pub metadata: serde_json::Value,
    pub package_id: Option<Uuid>,
    pub package_name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Structured persistence for ingested files.
///
/// Implementations must be safe for concurrent use across requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert the file row in `pending` state.
    async fn create_file_record(&self, record: NewFileRecord) -> Result<FileRecord, AppError>;

    /// Insert all chunks of one file atomically. Returns the number of rows.
    async fn insert_chunks(
        &self,
        file_id: Uuid,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, AppError>;

    async fn set_status(&self, file_id: Uuid, status: FileStatus) -> Result<(), AppError>;

    /// Flip the file row to `ready` once its chunks are durable.
    async fn mark_ready(&self, file_id: Uuid) -> Result<(), AppError> {
        self.set_status(file_id, FileStatus::Ready).await
    }
}

#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for FileRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "file_objects", db.operation = "insert", db.record_id = %record.id))]
    async fn create_file_record(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let row = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO file_objects (
                id, file_name, description, created_by, session_id, file_type,
                s3_key, s3_url, metadata, package_id, package_name, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, file_name, description, created_by, session_id, file_type,
                      s3_key, s3_url, metadata, package_id, package_name, status, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.description)
        .bind(&record.created_by)
        .bind(&record.session_id)
        .bind(&record.file_type)
        .bind(&record.storage_key)
        .bind(&record.storage_url)
        .bind(&record.metadata)
        .bind(record.package_id)
        .bind(&record.package_name)
        .bind(FileStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, chunks, embeddings), fields(db.table = "file_chunks", db.operation = "insert", db.record_id = %file_id, chunks = chunks.len()))]
    async fn insert_chunks(
        &self,
        file_id: Uuid,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, AppError> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let rows: Vec<(i32, &String, &Vec<f32>)> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| (index as i32, content, embedding))
            .collect();

        let mut tx = self.pool.begin().await?;
        for batch in rows.chunks(CHUNK_INSERT_BATCH) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO file_chunks (id, file_id, chunk_index, content, embedding) ",
            );
            builder.push_values(batch, |mut row, (index, content, embedding)| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(file_id)
                    .push_bind(*index)
                    .push_bind((*content).clone())
                    .push_bind(Vector::from((*embedding).clone()));
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(rows.len())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_objects", db.operation = "update", db.record_id = %file_id))]
    async fn set_status(&self, file_id: Uuid, status: FileStatus) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE file_objects SET status = $2 WHERE id = $1")
            .bind(file_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "file record {} not found",
                file_id
            )));
        }
        Ok(())
    }
}
