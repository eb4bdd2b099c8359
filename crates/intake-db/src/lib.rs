//! Intake DB Library
//!
//! Structured persistence for ingested documents: one row per file in
//! `file_objects` and one row per embedded chunk in `file_chunks`.

pub mod db;

pub use db::{DocumentStore, FileRecord, FileRepository, FileStatus, NewFileRecord};
