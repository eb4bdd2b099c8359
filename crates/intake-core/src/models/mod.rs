pub mod document;
pub mod ingest;

pub use document::*;
pub use ingest::*;
