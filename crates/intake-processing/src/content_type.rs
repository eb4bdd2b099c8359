//! Best-effort media type resolution.

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Lowercased media type without parameters.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Trust the declared type when present, otherwise guess from the extension,
/// otherwise fall back to `application/octet-stream`.
pub fn resolve_content_type(filename: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared.map(normalize_content_type) {
        if !declared.is_empty() {
            return declared;
        }
    }

    mime_guess::from_path(filename)
        .first_raw()
        .map(str::to_string)
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Lowercased extension without the dot.
pub fn extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether `filename` carries one of the allow-listed extensions.
pub fn has_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    extension(filename).is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
}
