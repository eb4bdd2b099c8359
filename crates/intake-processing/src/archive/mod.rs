//! Archive expansion.
//!
//! [`ArchiveReader::open`] recognizes the container, enforces the entry-count
//! ceiling up front, then yields members lazily through [`ArchiveMembers`].
//! Decompression runs on the blocking pool; a bounded channel keeps at most
//! one decoded member waiting for the consumer at a time.

mod format;
mod policy;
mod readers;

pub use format::ArchiveFormat;

use bytes::Bytes;
use intake_core::AppError;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_MAX_MEMBER_SIZE: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("archive contains more than {max} entries")]
    TooManyEntries { max: usize },

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("archive extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error("archive IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::UnsupportedFormat(name) => AppError::UnsupportedFormat(name),
            ArchiveError::TooManyEntries { max } => AppError::ArchiveTooLarge { max },
            ArchiveError::Corrupt(msg) => AppError::CorruptArchive(msg),
            ArchiveError::ExtractorUnavailable(msg) => AppError::UnsupportedFormat(msg),
            ArchiveError::Io(e) => AppError::CorruptArchive(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_member_size: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_member_size: DEFAULT_MAX_MEMBER_SIZE,
        }
    }
}

/// One accepted archive member, fully read into memory.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// Normalized path inside the archive, `/`-separated
    pub name: String,
    pub data: Bytes,
    pub content_type: String,
}

/// Expands uploaded containers under fixed resource limits.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    limits: ArchiveLimits,
    unar_path: PathBuf,
}

impl Default for ArchiveReader {
    fn default() -> Self {
        Self::new(ArchiveLimits::default(), "unar")
    }
}

impl ArchiveReader {
    pub fn new(limits: ArchiveLimits, unar_path: impl Into<PathBuf>) -> Self {
        Self {
            limits,
            unar_path: unar_path.into(),
        }
    }

    pub fn limits(&self) -> &ArchiveLimits {
        &self.limits
    }

    /// Whether an upload is a container this reader understands.
    pub fn detect(&self, filename: &str, content_type: Option<&str>) -> Option<ArchiveFormat> {
        ArchiveFormat::detect(filename, content_type)
    }

    /// Open `data` as an archive and return its members as a lazy sequence.
    ///
    /// Fails with `UnsupportedFormat` when neither the name nor the declared
    /// content type names a container, `TooManyEntries` when the declared entry
    /// count exceeds the ceiling, and `Corrupt` when the container cannot be
    /// parsed.
    pub async fn open(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<ArchiveMembers, ArchiveError> {
        let format = ArchiveFormat::detect(filename, content_type)
            .ok_or_else(|| ArchiveError::UnsupportedFormat(filename.to_string()))?;

        let limits = self.limits;
        let unar_path = self.unar_path.clone();
        let size_bytes = data.len();

        let (reader, entry_count) = tokio::task::spawn_blocking(move || {
            let mut reader = readers::open(format, data, &unar_path, &limits)?;
            let entries = reader.entry_count(limits.max_entries)?;
            if entries > limits.max_entries {
                return Err(ArchiveError::TooManyEntries {
                    max: limits.max_entries,
                });
            }
            Ok((reader, entries))
        })
        .await
        .map_err(|e| ArchiveError::Corrupt(format!("archive reader task failed: {}", e)))??;

        tracing::info!(
            archive = %filename,
            format = %format,
            entries = entry_count,
            size_bytes,
            "Opened archive"
        );

        let (tx, rx) = mpsc::channel(1);
        let producer = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let result = policy::drive(reader.as_mut(), &limits, &mut |member: ArchiveMember| {
                tx.blocking_send(Ok(member)).is_ok()
            });
            if let Err(e) = result {
                let _ = tx.blocking_send(Err(e));
            }
        });

        Ok(ArchiveMembers {
            format,
            entry_count,
            rx,
            producer: Some(producer),
        })
    }
}

/// Lazy, finite, non-restartable sequence of archive members.
///
/// Dropping it early stops decompression at the next member boundary.
#[derive(Debug)]
pub struct ArchiveMembers {
    format: ArchiveFormat,
    entry_count: usize,
    rx: mpsc::Receiver<Result<ArchiveMember, ArchiveError>>,
    producer: Option<JoinHandle<()>>,
}

impl ArchiveMembers {
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Entries declared by the container, including skipped ones.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Next accepted member, or `None` once the archive is exhausted.
    ///
    /// An `Err` ends the sequence.
    pub async fn next(&mut self) -> Option<Result<ArchiveMember, ArchiveError>> {
        if let Some(item) = self.rx.recv().await {
            return Some(item);
        }

        let producer = self.producer.take()?;
        match producer.await {
            Ok(()) => None,
            Err(e) => Some(Err(ArchiveError::Corrupt(format!(
                "archive reader task failed: {}",
                e
            )))),
        }
    }

    /// Drain the remaining members, stopping at the first error.
    pub async fn collect(mut self) -> Result<Vec<ArchiveMember>, ArchiveError> {
        let mut members = Vec::new();
        while let Some(member) = self.next().await {
            members.push(member?);
        }
        Ok(members)
    }
}
