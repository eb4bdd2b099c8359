//! Common utilities for the upload handler

use axum::extract::Multipart;
use bytes::{Bytes, BytesMut};
use intake_core::AppError;
use intake_processing::content_type::{extension, normalize_content_type, OCTET_STREAM};

use crate::error::HttpAppError;
use crate::state::UploadLimits;

const MAX_FILENAME_LENGTH: usize = 255;

/// One top-level file part of an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared media type; `None` when absent or the generic binary type
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Read every file part of the form, enforcing the per-file ceiling while streaming.
///
/// Parts without a filename are ordinary form fields and ignored.
pub async fn read_uploads(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<Vec<UploadedFile>, HttpAppError> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = sanitize_filename(&raw_name)?;
        let content_type = field
            .content_type()
            .map(normalize_content_type)
            .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM);

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            if buffer.len() + chunk.len() > max_file_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File '{}' exceeds maximum allowed size of {} MB",
                    name,
                    max_file_size / 1024 / 1024
                ))
                .into());
            }
            buffer.extend_from_slice(&chunk);
        }

        files.push(UploadedFile {
            name,
            content_type,
            data: buffer.freeze(),
        });
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()).into());
    }
    Ok(files)
}

/// Check a non-archive top-level upload against the document allow-list.
///
/// A file with an extension must carry an allow-listed one; a file without an
/// extension must declare an allow-listed content type.
pub fn validate_document_upload(file: &UploadedFile, limits: &UploadLimits) -> Result<(), AppError> {
    let allowed = match extension(&file.name) {
        Some(ext) => limits
            .allowed_extensions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&ext)),
        None => file.content_type.as_deref().is_some_and(|ct| {
            limits
                .allowed_content_types
                .iter()
                .any(|a| a.eq_ignore_ascii_case(ct))
        }),
    };

    if !allowed {
        return Err(AppError::UnsupportedMediaType(format!(
            "File '{}' is not an allowed document type. Allowed extensions: {}",
            file.name,
            limits.allowed_extensions.join(", ")
        )));
    }
    Ok(())
}

/// Keep only the final path component and replace characters unsafe in logs and headers.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if filename_only == ".." || filename_only == "." {
        return Err(AppError::BadRequest(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();

    if sanitized.is_empty() {
        return Ok("file".to_string());
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> UploadLimits {
        UploadLimits {
            max_file_size: 1024,
            max_request_body: 4096,
            allowed_extensions: vec!["pdf".into(), "docx".into(), "png".into()],
            allowed_content_types: vec!["application/pdf".into(), "image/png".into()],
        }
    }

    fn upload(name: &str, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(b"data"),
        }
    }

    #[test]
    fn allow_list_is_extension_driven() {
        assert!(validate_document_upload(&upload("Invoice.PDF", None), &limits()).is_ok());
        let err =
            validate_document_upload(&upload("setup.exe", Some("application/pdf")), &limits())
                .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn extensionless_files_need_allowed_content_type() {
        assert!(validate_document_upload(&upload("scan", Some("image/png")), &limits()).is_ok());
        assert!(validate_document_upload(&upload("scan", Some("text/plain")), &limits()).is_err());
        assert!(validate_document_upload(&upload("scan", None), &limits()).is_err());
    }

    #[test]
    fn sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\счёт.pdf").unwrap(), "счёт.pdf");
        assert_eq!(sanitize_filename("  ").unwrap(), "file");
        assert!(sanitize_filename("a/..").is_err());
    }
}
