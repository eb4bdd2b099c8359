use lopdf::Document;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::image::ocr_image_bytes;
use super::ocr::{OcrEngine, PdfRasterizer};

/// How far into the file the `%PDF-` header may appear.
const SIGNATURE_WINDOW: usize = 1024;

fn has_pdf_signature(data: &[u8]) -> bool {
    let window = &data[..data.len().min(SIGNATURE_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Text layer, page by page. A page that fails is skipped.
fn text_layer(data: &[u8]) -> Option<String> {
    let doc = match Document::load_mem(data) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "PDF text layer unavailable");
            return None;
        }
    };

    let mut text = String::new();
    for page in doc.get_pages().keys() {
        match doc.extract_text(&[*page]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                tracing::debug!(page = *page, error = %e, "Skipping unreadable PDF page");
            }
        }
    }
    non_empty(text)
}

/// pdf-extract copes with more malformed structure than the page walk but
/// panics on some fonts, so it runs under `catch_unwind`.
fn tolerant_parse(data: &[u8]) -> Option<String> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data))) {
        Ok(Ok(text)) => non_empty(text),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Tolerant PDF parse failed");
            None
        }
        Err(_) => {
            tracing::warn!("Tolerant PDF parse panicked, likely malformed fonts");
            None
        }
    }
}

fn ocr_pages(
    data: &[u8],
    ocr: &dyn OcrEngine,
    rasterizer: &dyn PdfRasterizer,
    max_pages: usize,
) -> Option<String> {
    let pages = match rasterizer.rasterize(data, max_pages) {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!(error = %e, "PDF rasterization failed");
            Vec::new()
        }
    };

    let mut text = String::new();
    for (index, page) in pages.iter().enumerate() {
        match ocr.recognize(page) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => tracing::warn!(page = index, error = %e, "OCR failed for PDF page"),
        }
    }
    non_empty(text)
}

/// Three tiers, each tried only when the previous produced nothing: text
/// layer, tolerant parser, then OCR of the first `max_pages` pages. Input
/// without a PDF signature goes straight to OCR, including as a plain image.
pub(crate) fn extract_pdf(
    data: &[u8],
    ocr: &dyn OcrEngine,
    rasterizer: &dyn PdfRasterizer,
    max_pages: usize,
) -> String {
    let signed = has_pdf_signature(data);

    if signed {
        if let Some(text) = text_layer(data) {
            return text;
        }
        if let Some(text) = tolerant_parse(data) {
            return text;
        }
    } else {
        tracing::debug!("Input has no PDF signature, going straight to OCR");
    }

    if let Some(text) = ocr_pages(data, ocr, rasterizer, max_pages) {
        return text;
    }

    if !signed {
        match ocr_image_bytes(data, ocr) {
            Ok(text) => {
                if let Some(text) = non_empty(text) {
                    return text;
                }
            }
            Err(e) => tracing::debug!(error = %e, "Input is not a decodable image either"),
        }
    }

    String::new()
}
