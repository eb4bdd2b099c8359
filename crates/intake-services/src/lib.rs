//! Intake Services Layer
//!
//! Clients for the external capabilities the ingestion pipeline consumes:
//! document classification, structured field extraction, text embeddings and
//! the optional structured-record export sink. Each capability is a trait so
//! the pipeline can be driven by substitute implementations in tests.
//!
//! All failures surface as [`intake_core::AppError::ExternalService`].

pub mod classification;
pub mod embedding;
pub mod export;
pub mod extraction;
pub mod llm;

pub use classification::{DocumentClassifier, LlmClassifier};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddings};
pub use export::{HttpRecordExporter, RecordExporter};
pub use extraction::{LlmExtractor, StructuredExtractor};
pub use llm::{LlmSettings, ResponsesClient};
