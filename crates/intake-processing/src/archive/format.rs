use std::fmt;
use std::str::FromStr;

use super::ArchiveError;

/// Container formats the archive reader can expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    SevenZ,
    Rar,
}

// Longest suffixes first so ".tar.gz" wins over ".tar".
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tgz", ArchiveFormat::TarGz),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tbz", ArchiveFormat::TarBz2),
    (".zip", ArchiveFormat::Zip),
    (".tar", ArchiveFormat::Tar),
    (".7z", ArchiveFormat::SevenZ),
    (".rar", ArchiveFormat::Rar),
];

impl ArchiveFormat {
    /// Detect the container format from the upload name, then from the declared
    /// content type. Returns `None` when neither signal names a container.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Option<Self> {
        Self::from_filename(filename).or_else(|| content_type.and_then(Self::from_content_type))
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.trim().to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, format)| *format)
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/zip" | "application/x-zip-compressed" => Some(ArchiveFormat::Zip),
            "application/x-tar" => Some(ArchiveFormat::Tar),
            "application/gzip" | "application/x-gzip" | "application/x-gtar" => {
                Some(ArchiveFormat::TarGz)
            }
            "application/x-bzip2" | "application/x-bzip" => Some(ArchiveFormat::TarBz2),
            "application/x-7z-compressed" => Some(ArchiveFormat::SevenZ),
            "application/vnd.rar" | "application/x-rar-compressed" | "application/x-rar" => {
                Some(ArchiveFormat::Rar)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::SevenZ => "7z",
            ArchiveFormat::Rar => "rar",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| suffix[1..] == normalized)
            .map(|(_, format)| *format)
            .ok_or_else(|| ArchiveError::UnsupportedFormat(s.to_string()))
    }
}
