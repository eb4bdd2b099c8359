use intake_core::{AppError, IngestItem, IngestedDocument};
use intake_db::{DocumentStore, FileStatus, NewFileRecord};
use intake_processing::{ExtractError, TextChunker, TextExtractor};
use intake_services::{DocumentClassifier, EmbeddingProvider, RecordExporter, StructuredExtractor};
use intake_storage::Storage;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// External collaborators of the pipeline, constructed once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<dyn DocumentStore>,
    pub classifier: Arc<dyn DocumentClassifier>,
    pub extractor: Arc<dyn StructuredExtractor>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub exporter: Option<Arc<dyn RecordExporter>>,
}

/// Runs a single item end to end.
///
/// Errors from any step propagate unchanged so the batch coordinator can
/// attribute them to the item. Only text extraction is allowed to degrade:
/// classification works from the stored URL, so missing text just means no
/// chunks.
pub struct IngestPipeline {
    collaborators: Collaborators,
    text: Arc<TextExtractor>,
    chunker: TextChunker,
}

impl IngestPipeline {
    pub fn new(collaborators: Collaborators, text: TextExtractor, chunker: TextChunker) -> Self {
        Self {
            collaborators,
            text: Arc::new(text),
            chunker,
        }
    }

    #[tracing::instrument(
        skip(self, item),
        fields(
            filename = %item.name,
            content_type = %item.content_type,
            size_bytes = item.data.len(),
            package_id = ?item.package.as_ref().map(|p| p.id),
            session_id = %item.session_id,
        )
    )]
    pub async fn ingest(&self, item: &IngestItem) -> Result<IngestedDocument, AppError> {
        let start = Instant::now();
        let c = &self.collaborators;

        let stored = c
            .storage
            .put(
                &item.name,
                &item.content_type,
                item.data.clone(),
                &item.session_id,
            )
            .await?;

        let text = self.extract_text(item).await?;

        let is_image = item.is_image();
        let classification = c.classifier.classify(&stored.url, is_image).await?;
        let record = c
            .extractor
            .extract(&stored.url, is_image, classification.document_type)
            .await?;

        let chunks = self.chunk(text).await?;
        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            c.embeddings.embed_many(&chunks).await?
        };

        let file_id = Uuid::new_v4();
        c.documents
            .create_file_record(NewFileRecord {
                id: file_id,
                file_name: item.name.clone(),
                description: None,
                created_by: item.user_id.clone(),
                session_id: item.session_id.clone(),
                file_type: item.content_type.clone(),
                storage_key: stored.key.clone(),
                storage_url: stored.url.clone(),
                metadata: json!({
                    "metadata1": classification,
                    "metadata2": record,
                }),
                package_id: item.package.as_ref().map(|p| p.id),
                package_name: item.package.as_ref().map(|p| p.name.clone()),
            })
            .await?;

        let chunk_count = match c.documents.insert_chunks(file_id, &chunks, &vectors).await {
            Ok(count) => count,
            Err(e) => {
                if let Err(mark_err) = c.documents.set_status(file_id, FileStatus::Failed).await {
                    tracing::error!(file_id = %file_id, error = %mark_err, "Failed to mark file record as failed");
                }
                return Err(e);
            }
        };
        c.documents.mark_ready(file_id).await?;

        if let Some(exporter) = &c.exporter {
            if let Err(e) = exporter.export(&record).await {
                tracing::warn!(file_id = %file_id, error = %e, "Structured record export failed");
            }
        }

        tracing::info!(
            file_id = %file_id,
            storage_key = %stored.key,
            document_type = %classification.document_type,
            chunks = chunk_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document ingested"
        );

        Ok(IngestedDocument {
            id: file_id,
            name: item.name.clone(),
            content_type: item.content_type.clone(),
            url: stored.url,
            key: stored.key,
            size: stored.size,
            package_id: item.package.as_ref().map(|p| p.id),
            package_name: item.package.as_ref().map(|p| p.name.clone()),
            metadata1: classification,
            metadata2: record,
            chunks: chunk_count,
        })
    }

    /// Extract on the blocking pool. Only an unsupported content type fails the item.
    async fn extract_text(&self, item: &IngestItem) -> Result<String, AppError> {
        let text = self.text.clone();
        let data = item.data.clone();
        let name = item.name.clone();
        let content_type = item.content_type.clone();

        let result =
            tokio::task::spawn_blocking(move || text.extract(&data, &name, &content_type)).await;

        match result {
            Ok(Ok(text)) => {
                if text.is_empty() {
                    tracing::warn!("No text extracted; continuing with URL-based classification");
                }
                Ok(text)
            }
            Ok(Err(e @ ExtractError::UnsupportedContentType(_))) => Err(e.into()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Text extraction failed; continuing without text");
                Ok(String::new())
            }
            Err(e) => {
                tracing::error!(error = %e, "Text extraction task failed; continuing without text");
                Ok(String::new())
            }
        }
    }

    async fn chunk(&self, text: String) -> Result<Vec<String>, AppError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let chunker = self.chunker.clone();
        chunking_outcome(tokio::task::spawn_blocking(move || chunker.split(&text)).await)
    }
}

fn chunking_outcome(
    result: Result<Vec<String>, tokio::task::JoinError>,
) -> Result<Vec<String>, AppError> {
    result.map_err(|e| {
        tracing::error!(error = %e, "Chunking task failed");
        AppError::Internal(format!("chunking task failed: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_chunking_task_is_an_error() {
        let join = tokio::task::spawn_blocking(|| -> Vec<String> { panic!("chunker blew up") }).await;

        let err = chunking_outcome(join).unwrap_err();
        assert!(matches!(err, AppError::Internal(ref msg) if msg.contains("chunking task failed")));
    }

    #[tokio::test]
    async fn chunks_pass_through() {
        let join = tokio::task::spawn_blocking(|| vec!["a".to_string()]).await;
        assert_eq!(chunking_outcome(join).unwrap(), vec!["a".to_string()]);
    }
}
