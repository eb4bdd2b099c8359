use bytes::Bytes;
use sevenz_rust::{Password, SevenZReader as Inner};
use std::io::{self, Cursor};

use super::{ContainerReader, EntryHeader, EntryKind, EntryVisitor};
use crate::archive::ArchiveError;

pub(crate) struct SevenZReader {
    inner: Inner<Cursor<Bytes>>,
}

impl SevenZReader {
    pub fn new(data: Bytes) -> Result<Self, ArchiveError> {
        let len = data.len() as u64;
        let inner = Inner::new(Cursor::new(data), len, Password::empty()).map_err(corrupt)?;
        Ok(Self { inner })
    }
}

fn corrupt(err: sevenz_rust::Error) -> ArchiveError {
    ArchiveError::Corrupt(format!("7z: {}", err))
}

impl ContainerReader for SevenZReader {
    fn entry_count(&mut self, _ceiling: usize) -> Result<usize, ArchiveError> {
        Ok(self.inner.archive().files.len())
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
        // The callback can only return the library's error type, so ours is
        // parked here and the walk is stopped.
        let mut failure: Option<ArchiveError> = None;

        let walked = self.inner.for_each_entries(|entry, reader| {
            let header = EntryHeader {
                name: entry.name().to_string(),
                size: entry.size(),
                kind: if entry.is_directory() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            };

            match visit(header, reader) {
                Ok(true) => {
                    // Solid blocks are decoded sequentially; drain what the
                    // visitor left unread before moving on.
                    if let Err(e) = io::copy(reader, &mut io::sink()) {
                        failure = Some(ArchiveError::Corrupt(format!("7z: {}", e)));
                        return Ok(false);
                    }
                    Ok(true)
                }
                Ok(false) => Ok(false),
                Err(e) => {
                    failure = Some(e);
                    Ok(false)
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        walked.map_err(corrupt)
    }
}
