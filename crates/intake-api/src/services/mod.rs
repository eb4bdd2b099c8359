//! Ingestion services driven by the upload handler.

pub mod ingest;
