//! Plain-text extraction from uploaded documents.

mod docx;
mod image;
pub mod ocr;
mod pdf;

use intake_core::AppError;
use std::sync::Arc;
use thiserror::Error;

use crate::content_type::{extension, normalize_content_type, DOCX, PDF};
use ocr::{NoOcr, NoRasterizer, OcrEngine, PdfRasterizer};

pub const DEFAULT_PDF_OCR_MAX_PAGES: usize = 5;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "gif"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("image decoding failed: {0}")]
    Image(String),

    #[error("PDF rasterization failed: {0}")]
    Rasterize(String),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedContentType(ct) => AppError::UnsupportedContentType(ct),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Document families the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFamily {
    Pdf,
    Docx,
    Image,
}

impl DocumentFamily {
    /// The content type decides when it names a family; the filename
    /// extension is the fallback.
    pub fn detect(filename: &str, content_type: &str) -> Option<Self> {
        let ct = normalize_content_type(content_type);
        if ct == PDF {
            return Some(DocumentFamily::Pdf);
        }
        if ct == DOCX {
            return Some(DocumentFamily::Docx);
        }
        if ct.starts_with("image/") {
            return Some(DocumentFamily::Image);
        }

        match extension(filename)?.as_str() {
            "pdf" => Some(DocumentFamily::Pdf),
            "docx" => Some(DocumentFamily::Docx),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(DocumentFamily::Image),
            _ => None,
        }
    }
}

/// Text extractor with pluggable OCR and PDF rasterization.
///
/// Extraction is CPU-bound; async callers run it on the blocking pool.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PdfRasterizer>,
    pdf_ocr_max_pages: usize,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(NoOcr), Arc::new(NoRasterizer))
    }
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        Self {
            ocr,
            rasterizer,
            pdf_ocr_max_pages: DEFAULT_PDF_OCR_MAX_PAGES,
        }
    }

    pub fn with_pdf_ocr_max_pages(mut self, pages: usize) -> Self {
        self.pdf_ocr_max_pages = pages;
        self
    }

    /// Extract plain text from `data`.
    ///
    /// Only an unrecognized document family is an error. Unreadable pages,
    /// parser failures and OCR failures are logged and produce less (or no)
    /// text.
    pub fn extract(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<String, ExtractError> {
        let family = DocumentFamily::detect(filename, content_type)
            .ok_or_else(|| ExtractError::UnsupportedContentType(content_type.to_string()))?;

        let start = std::time::Instant::now();
        let text = match family {
            DocumentFamily::Pdf => pdf::extract_pdf(
                data,
                self.ocr.as_ref(),
                self.rasterizer.as_ref(),
                self.pdf_ocr_max_pages,
            ),
            DocumentFamily::Docx => docx::extract_docx(data).unwrap_or_else(|e| {
                tracing::warn!(filename = %filename, error = %e, "DOCX extraction failed");
                String::new()
            }),
            DocumentFamily::Image => {
                image::extract_image(data, self.ocr.as_ref()).unwrap_or_else(|e| {
                    tracing::warn!(filename = %filename, error = %e, "Image OCR failed");
                    String::new()
                })
            }
        };

        tracing::debug!(
            filename = %filename,
            family = ?family,
            chars = text.chars().count(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Text extraction finished"
        );

        Ok(text)
    }
}
