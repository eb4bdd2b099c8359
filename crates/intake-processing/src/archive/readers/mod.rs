//! Per-format container readers.
//!
//! Each reader only knows how to count and walk its entries; screening and
//! size limits are applied once in `policy::drive`.

mod rar_reader;
mod sevenz_reader;
mod tar_reader;
mod zip_reader;

use bytes::Bytes;
use std::io::Read;
use std::path::Path;

use super::{ArchiveError, ArchiveFormat, ArchiveLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    File,
    Directory,
    /// Links, devices and anything else that is not plain data.
    Other,
}

#[derive(Debug, Clone)]
pub(crate) struct EntryHeader {
    pub name: String,
    /// Uncompressed size as declared by the container.
    pub size: u64,
    pub kind: EntryKind,
}

/// Visitor called once per entry. Returning `Ok(false)` stops the walk.
pub(crate) type EntryVisitor<'a> =
    dyn FnMut(EntryHeader, &mut dyn Read) -> Result<bool, ArchiveError> + 'a;

pub(crate) trait ContainerReader: Send {
    /// Number of entries the container declares, directories included.
    ///
    /// Exact up to `ceiling`; past it a reader may stop counting and return
    /// any value above `ceiling`.
    fn entry_count(&mut self, ceiling: usize) -> Result<usize, ArchiveError>;

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError>;
}

pub(crate) fn open(
    format: ArchiveFormat,
    data: Bytes,
    unar_path: &Path,
    limits: &ArchiveLimits,
) -> Result<Box<dyn ContainerReader>, ArchiveError> {
    let reader: Box<dyn ContainerReader> = match format {
        ArchiveFormat::Zip => Box::new(zip_reader::ZipReader::new(data)?),
        ArchiveFormat::Tar => Box::new(tar_reader::TarReader::new(
            data,
            tar_reader::Compression::None,
        )),
        ArchiveFormat::TarGz => Box::new(tar_reader::TarReader::new(
            data,
            tar_reader::Compression::Gzip,
        )),
        ArchiveFormat::TarBz2 => Box::new(tar_reader::TarReader::new(
            data,
            tar_reader::Compression::Bzip2,
        )),
        ArchiveFormat::SevenZ => Box::new(sevenz_reader::SevenZReader::new(data)?),
        ArchiveFormat::Rar => Box::new(rar_reader::RarReader::list(&data, unar_path, limits)?),
    };
    Ok(reader)
}
