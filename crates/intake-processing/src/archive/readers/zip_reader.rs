use bytes::Bytes;
use std::io::Cursor;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{ContainerReader, EntryHeader, EntryKind, EntryVisitor};
use crate::archive::ArchiveError;

pub(crate) struct ZipReader {
    archive: ZipArchive<Cursor<Bytes>>,
}

impl ZipReader {
    pub fn new(data: Bytes) -> Result<Self, ArchiveError> {
        let archive = ZipArchive::new(Cursor::new(data)).map_err(corrupt)?;
        Ok(Self { archive })
    }
}

fn corrupt(err: ZipError) -> ArchiveError {
    ArchiveError::Corrupt(format!("zip: {}", err))
}

impl ContainerReader for ZipReader {
    fn entry_count(&mut self, _ceiling: usize) -> Result<usize, ArchiveError> {
        Ok(self.archive.len())
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
        for index in 0..self.archive.len() {
            let mut file = match self.archive.by_index(index) {
                Ok(file) => file,
                Err(ZipError::UnsupportedArchive(reason))
                    if reason == ZipError::PASSWORD_REQUIRED =>
                {
                    tracing::warn!(index, "Skipping encrypted zip member");
                    continue;
                }
                Err(e) => return Err(corrupt(e)),
            };

            let kind = if file.is_dir() {
                EntryKind::Directory
            } else if file.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            let header = EntryHeader {
                name: file.name().to_string(),
                size: file.size(),
                kind,
            };

            if !visit(header, &mut file)? {
                break;
            }
        }
        Ok(())
    }
}
