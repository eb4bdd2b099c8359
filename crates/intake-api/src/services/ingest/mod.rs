//! Document ingestion.
//!
//! [`IngestPipeline`] runs one item through storage, text extraction,
//! classification, structured extraction, chunk embedding and persistence.
//! [`BatchCoordinator`] expands archives and turns every item into exactly one
//! result entry, converting failures into error entries.

mod batch;
mod pipeline;

pub use batch::BatchCoordinator;
pub use pipeline::{Collaborators, IngestPipeline};
