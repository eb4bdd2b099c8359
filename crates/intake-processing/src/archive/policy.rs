//! Member screening shared by every container format.

use bytes::Bytes;
use std::io::Read;

use super::readers::{ContainerReader, EntryHeader, EntryKind};
use super::{ArchiveError, ArchiveLimits, ArchiveMember};
use crate::content_type::resolve_content_type;

const JUNK_DIRECTORY: &str = "__MACOSX";
const JUNK_FILE_PREFIX: &str = "._";

/// Outcome of screening one entry header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Screening {
    Accept(String),
    Directory,
    Junk,
    Traversal,
    Oversize(u64),
}

/// Split an entry path into its meaningful segments. Backslashes count as
/// separators, `.` and empty segments are dropped. `None` when any segment
/// climbs to a parent directory.
pub(crate) fn normalize_member_path(raw: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }
    Some(segments)
}

fn is_junk(segments: &[&str]) -> bool {
    segments.iter().any(|s| *s == JUNK_DIRECTORY)
        || segments
            .last()
            .is_some_and(|name| name.starts_with(JUNK_FILE_PREFIX))
}

pub(crate) fn screen(header: &EntryHeader, limits: &ArchiveLimits) -> Screening {
    if header.kind == EntryKind::Directory {
        return Screening::Directory;
    }

    let Some(segments) = normalize_member_path(&header.name) else {
        return Screening::Traversal;
    };

    if segments.is_empty() || is_junk(&segments) || header.kind == EntryKind::Other {
        return Screening::Junk;
    }

    if header.size > limits.max_member_size as u64 {
        return Screening::Oversize(header.size);
    }

    Screening::Accept(segments.join("/"))
}

/// Walk every entry of `reader`, hand accepted members to `emit` in archive
/// order. Stops early when `emit` returns `false`.
pub(crate) fn drive(
    reader: &mut dyn ContainerReader,
    limits: &ArchiveLimits,
    emit: &mut dyn FnMut(ArchiveMember) -> bool,
) -> Result<(), ArchiveError> {
    let max = limits.max_member_size;

    reader.for_each_entry(&mut |header: EntryHeader, content: &mut dyn Read| {
        let name = match screen(&header, limits) {
            Screening::Accept(name) => name,
            Screening::Directory => return Ok(true),
            Screening::Junk => {
                tracing::debug!(member = %header.name, "Skipping archive metadata entry");
                return Ok(true);
            }
            Screening::Traversal => {
                tracing::warn!(
                    member = %header.name,
                    "Skipping archive member with parent-directory path segment"
                );
                return Ok(true);
            }
            Screening::Oversize(size) => {
                tracing::warn!(
                    member = %header.name,
                    size_bytes = size,
                    max_bytes = max,
                    "Skipping oversized archive member"
                );
                return Ok(true);
            }
        };

        // Declared sizes can lie, so the read itself is bounded too.
        let mut buf = Vec::with_capacity(header.size.min(max as u64) as usize);
        content
            .take(max as u64 + 1)
            .read_to_end(&mut buf)
            .map_err(|e| ArchiveError::Corrupt(format!("failed to read '{}': {}", name, e)))?;

        if buf.len() > max {
            tracing::warn!(
                member = %name,
                max_bytes = max,
                "Skipping archive member that expanded past the size limit"
            );
            return Ok(true);
        }

        let content_type = resolve_content_type(&name, None);
        Ok(emit(ArchiveMember {
            name,
            data: Bytes::from(buf),
            content_type,
        }))
    })
}
