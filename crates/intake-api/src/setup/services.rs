//! Collaborator construction and application state.

use anyhow::{Context, Result};
use intake_core::Config;
use intake_db::FileRepository;
use intake_processing::{
    ArchiveLimits, ArchiveReader, OcrEngine, PdfRasterizer, TextChunker, TextExtractor,
};
use intake_services::{
    HttpRecordExporter, LlmClassifier, LlmExtractor, LlmSettings, OpenAiEmbeddings,
    RecordExporter, ResponsesClient,
};
use intake_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::services::ingest::{BatchCoordinator, Collaborators, IngestPipeline};
use crate::state::{AppState, UploadLimits};

/// Build every collaborator once and wire them into the shared state.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let llm = ResponsesClient::new(LlmSettings::from_config(config))
        .context("Failed to build LLM client")?;
    tracing::info!(model = %llm.model(), "LLM client initialized");

    let embeddings =
        OpenAiEmbeddings::from_config(config).context("Failed to build embeddings client")?;
    tracing::info!(
        model = %config.embedding_model(),
        dimension = config.embedding_dim(),
        batch_size = config.embedding_batch_size(),
        "Embeddings client initialized"
    );

    let exporter: Option<Arc<dyn RecordExporter>> = match config.export_url() {
        Some(url) => {
            let exporter = HttpRecordExporter::new(
                url,
                Duration::from_secs(config.http_client_timeout_secs()),
            )
            .context("Failed to build record exporter")?;
            tracing::info!(url = %url, "Structured record export enabled");
            Some(Arc::new(exporter))
        }
        None => None,
    };

    let collaborators = Collaborators {
        storage,
        documents: Arc::new(FileRepository::new(pool.clone())),
        classifier: Arc::new(LlmClassifier::new(llm.clone())),
        extractor: Arc::new(LlmExtractor::new(llm)),
        embeddings: Arc::new(embeddings),
        exporter,
    };

    let text = TextExtractor::new(ocr_engine(config), pdf_rasterizer())
        .with_pdf_ocr_max_pages(config.pdf_ocr_max_pages());
    let chunker = TextChunker::new(config.chunk_size(), config.chunk_overlap());
    let pipeline = Arc::new(IngestPipeline::new(collaborators, text, chunker));

    let archives = ArchiveReader::new(
        ArchiveLimits {
            max_entries: config.archive_max_entries(),
            max_member_size: config.archive_max_member_size_bytes(),
        },
        config.unar_path(),
    );
    tracing::info!(
        max_entries = config.archive_max_entries(),
        max_member_size_bytes = config.archive_max_member_size_bytes(),
        unar_path = %config.unar_path(),
        "Archive reader initialized"
    );

    let coordinator =
        BatchCoordinator::new(pipeline, archives, config.allowed_extensions().to_vec());

    Ok(Arc::new(AppState {
        config: config.clone(),
        pool,
        upload: UploadLimits::from_config(config),
        coordinator,
    }))
}

#[cfg(feature = "tesseract")]
fn ocr_engine(config: &Config) -> Arc<dyn OcrEngine> {
    tracing::info!(languages = %config.ocr_languages(), "Tesseract OCR enabled");
    Arc::new(intake_processing::TesseractOcr::new(config.ocr_languages()))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_engine(_config: &Config) -> Arc<dyn OcrEngine> {
    tracing::warn!("Built without the tesseract feature; scanned documents yield no text");
    Arc::new(intake_processing::NoOcr)
}

#[cfg(feature = "pdfium")]
fn pdf_rasterizer() -> Arc<dyn PdfRasterizer> {
    Arc::new(intake_processing::PdfiumRasterizer)
}

#[cfg(not(feature = "pdfium"))]
fn pdf_rasterizer() -> Arc<dyn PdfRasterizer> {
    Arc::new(intake_processing::NoRasterizer)
}
