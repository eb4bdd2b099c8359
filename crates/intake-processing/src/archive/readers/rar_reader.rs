use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use super::{ContainerReader, EntryHeader, EntryKind, EntryVisitor};
use crate::archive::policy::{screen, Screening};
use crate::archive::{ArchiveError, ArchiveLimits};

/// One entry as reported by `lsar -j`, before anything is written to disk.
#[derive(Debug, Clone)]
struct ListedEntry {
    index: usize,
    header: EntryHeader,
    encrypted: bool,
}

/// RAR has no maintained pure-Rust decoder, so archives are listed with
/// `lsar` and accepted entries are unpacked one at a time with `unar`.
pub(crate) struct RarReader {
    // Dropping the reader removes the archive copy and any extracted member.
    dir: TempDir,
    archive_path: PathBuf,
    unar_path: PathBuf,
    limits: ArchiveLimits,
    entries: Vec<ListedEntry>,
}

impl RarReader {
    /// Copy the upload to scratch space and read its listing. Nothing is
    /// extracted yet.
    pub fn list(
        data: &[u8],
        unar_path: &Path,
        limits: &ArchiveLimits,
    ) -> Result<Self, ArchiveError> {
        let dir = tempfile::Builder::new().prefix("intake-rar-").tempdir()?;
        let archive_path = dir.path().join("upload.rar");

        let mut file = File::create(&archive_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        let lsar_path = unar_path.with_file_name("lsar");
        let output = run(
            Command::new(&lsar_path).arg("-j").arg(&archive_path),
            &lsar_path,
        )?;
        let entries = parse_listing(&String::from_utf8_lossy(&output.stdout))?;

        Ok(Self {
            dir,
            archive_path,
            unar_path: unar_path.to_path_buf(),
            limits: *limits,
            entries,
        })
    }

    /// Unpack the entry at `index` into its own directory and return the
    /// extracted file.
    fn extract_one(&self, index: usize) -> Result<Option<(TempDir, PathBuf)>, ArchiveError> {
        let out = tempfile::Builder::new()
            .prefix("member-")
            .tempdir_in(self.dir.path())?;

        run(
            Command::new(&self.unar_path)
                .arg("-q")
                .arg("-f")
                .arg("-D")
                .arg("-o")
                .arg(out.path())
                .arg("-indexes")
                .arg(&self.archive_path)
                .arg(index.to_string()),
            &self.unar_path,
        )?;

        let file = find_file(out.path())?;
        Ok(file.map(|path| (out, path)))
    }
}

fn run(command: &mut Command, program: &Path) -> Result<Output, ArchiveError> {
    let output = command.output().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ArchiveError::ExtractorUnavailable(format!(
            "'{}' not found; install unar to accept RAR uploads",
            program.display()
        )),
        _ => ArchiveError::Io(e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArchiveError::Corrupt(format!(
            "rar: {} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// lsar reports flags either as JSON booleans or as 0/1.
fn flag(entry: &Value, key: &str) -> bool {
    match &entry[key] {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn parse_listing(json: &str) -> Result<Vec<ListedEntry>, ArchiveError> {
    let listing: Value = serde_json::from_str(json)
        .map_err(|e| ArchiveError::Corrupt(format!("rar: unreadable lsar listing: {}", e)))?;

    let contents = listing["lsarContents"]
        .as_array()
        .ok_or_else(|| ArchiveError::Corrupt("rar: lsar listing has no contents".to_string()))?;

    let entries = contents
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let kind = if flag(entry, "XADIsDirectory") {
                EntryKind::Directory
            } else if flag(entry, "XADIsLink") {
                EntryKind::Other
            } else {
                EntryKind::File
            };

            ListedEntry {
                index: entry["XADIndex"]
                    .as_u64()
                    .map(|i| i as usize)
                    .unwrap_or(position),
                header: EntryHeader {
                    name: entry["XADFileName"].as_str().unwrap_or_default().to_string(),
                    size: entry["XADFileSize"].as_u64().unwrap_or(0),
                    kind,
                },
                encrypted: flag(entry, "XADIsEncrypted"),
            }
        })
        .collect();

    Ok(entries)
}

/// First regular file below `dir`. Links are never followed.
fn find_file(dir: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    children.sort();

    for path in children {
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_file() {
            return Ok(Some(path));
        }
        if meta.is_dir() {
            if let Some(found) = find_file(&path)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

impl ContainerReader for RarReader {
    fn entry_count(&mut self, _ceiling: usize) -> Result<usize, ArchiveError> {
        Ok(self.entries.len())
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
        for entry in &self.entries {
            if entry.encrypted {
                tracing::warn!(member = %entry.header.name, "Skipping encrypted rar member");
                continue;
            }

            // Rejected entries are never written to disk; the visitor still
            // sees the header so skips are logged in one place.
            if !matches!(screen(&entry.header, &self.limits), Screening::Accept(_)) {
                if !visit(entry.header.clone(), &mut io::empty())? {
                    break;
                }
                continue;
            }

            let keep_going = match self.extract_one(entry.index)? {
                Some((_out, path)) => {
                    let mut file = File::open(&path)?;
                    visit(entry.header.clone(), &mut file)?
                }
                None => {
                    tracing::warn!(
                        member = %entry.header.name,
                        "unar produced no file for rar member"
                    );
                    true
                }
            };
            if !keep_going {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "lsarFormatVersion": 2,
        "lsarContents": [
            {"XADFileName": "docs", "XADIsDirectory": true, "XADIndex": 0},
            {"XADFileName": "docs/a.pdf", "XADFileSize": 1200, "XADIndex": 1},
            {"XADFileName": "../evil.pdf", "XADFileSize": 10, "XADIndex": 2},
            {"XADFileName": "huge.pdf", "XADFileSize": 9000000000, "XADIndex": 3},
            {"XADFileName": "link.pdf", "XADIsLink": 1, "XADIndex": 4},
            {"XADFileName": "secret.pdf", "XADFileSize": 5, "XADIsEncrypted": 1, "XADIndex": 5}
        ]
    }"#;

    fn limits() -> ArchiveLimits {
        ArchiveLimits {
            max_entries: 10,
            max_member_size: 50 * 1024 * 1024,
        }
    }

    #[test]
    fn listing_keeps_raw_names_and_sizes() {
        let entries = parse_listing(LISTING).unwrap();
        assert_eq!(entries.len(), 6);

        assert_eq!(entries[0].header.kind, EntryKind::Directory);
        assert_eq!(entries[1].header.name, "docs/a.pdf");
        assert_eq!(entries[1].header.size, 1200);
        assert_eq!(entries[2].header.name, "../evil.pdf");
        assert_eq!(entries[4].header.kind, EntryKind::Other);
        assert!(entries[5].encrypted);
        assert_eq!(entries[3].index, 3);
    }

    #[test]
    fn listing_is_screened_before_extraction() {
        let entries = parse_listing(LISTING).unwrap();
        let l = limits();

        assert_eq!(
            screen(&entries[1].header, &l),
            Screening::Accept("docs/a.pdf".to_string())
        );
        assert_eq!(screen(&entries[2].header, &l), Screening::Traversal);
        assert_eq!(screen(&entries[3].header, &l), Screening::Oversize(9_000_000_000));
        assert_eq!(screen(&entries[4].header, &l), Screening::Junk);
    }

    #[test]
    fn missing_index_falls_back_to_position() {
        let listing = r#"{"lsarContents": [{"XADFileName": "a.pdf"}, {"XADFileName": "b.pdf"}]}"#;
        let entries = parse_listing(listing).unwrap();
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].header.kind, EntryKind::File);
    }

    #[test]
    fn malformed_listing_is_corrupt() {
        assert!(matches!(parse_listing("not json"), Err(ArchiveError::Corrupt(_))));
        assert!(matches!(parse_listing("{}"), Err(ArchiveError::Corrupt(_))));
    }

    #[test]
    fn missing_lister_is_reported() {
        let result = RarReader::list(
            b"Rar!\x1a\x07\x00",
            Path::new("/nonexistent/unar"),
            &limits(),
        );
        assert!(matches!(result, Err(ArchiveError::ExtractorUnavailable(_))));
    }

    #[test]
    fn find_file_descends_into_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.pdf"), b"x").unwrap();

        let found = find_file(dir.path()).unwrap().unwrap();
        assert!(found.ends_with("docs/a.pdf"));

        let empty = tempfile::tempdir().unwrap();
        assert!(find_file(empty.path()).unwrap().is_none());
    }
}
