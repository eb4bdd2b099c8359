use bytes::Bytes;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use tar::{Archive, EntryType};

use super::{ContainerReader, EntryHeader, EntryKind, EntryVisitor};
use crate::archive::ArchiveError;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Compression {
    None,
    Gzip,
    Bzip2,
}

/// Tar reader. Compressed streams are not seekable, so every pass decodes
/// from the start of the buffer.
pub(crate) struct TarReader {
    data: Bytes,
    compression: Compression,
}

impl TarReader {
    pub fn new(data: Bytes, compression: Compression) -> Self {
        Self { data, compression }
    }

    fn archive(&self) -> Archive<Box<dyn Read + Send>> {
        let raw = Cursor::new(self.data.clone());
        let stream: Box<dyn Read + Send> = match self.compression {
            Compression::None => Box::new(raw),
            Compression::Gzip => Box::new(GzDecoder::new(raw)),
            Compression::Bzip2 => Box::new(BzDecoder::new(raw)),
        };
        Archive::new(stream)
    }
}

fn corrupt(err: std::io::Error) -> ArchiveError {
    ArchiveError::Corrupt(format!("tar: {}", err))
}

fn kind_of(entry_type: EntryType) -> EntryKind {
    if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

impl ContainerReader for TarReader {
    fn entry_count(&mut self, ceiling: usize) -> Result<usize, ArchiveError> {
        let mut archive = self.archive();
        let mut count = 0;
        for entry in archive.entries().map_err(corrupt)? {
            entry.map_err(corrupt)?;
            count += 1;
            if count > ceiling {
                break;
            }
        }
        Ok(count)
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
        let mut archive = self.archive();
        for entry in archive.entries().map_err(corrupt)? {
            let mut entry = entry.map_err(corrupt)?;
            let header = EntryHeader {
                name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                size: entry.size(),
                kind: kind_of(entry.header().entry_type()),
            };

            if !visit(header, &mut entry)? {
                break;
            }
        }
        Ok(())
    }
}
