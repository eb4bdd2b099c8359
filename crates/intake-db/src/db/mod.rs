//! Database repositories for data access layer
//
// File records and their embedded chunks
pub mod file;

pub use file::{DocumentStore, FileRecord, FileRepository, FileStatus, NewFileRecord};
