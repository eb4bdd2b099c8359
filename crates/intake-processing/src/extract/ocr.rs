//! OCR and PDF rasterization backends.
//!
//! Both are traits so the extractor can run without native libraries; the
//! Tesseract and pdfium implementations sit behind the `tesseract` and
//! `pdfium` features.

use image::GrayImage;

use super::ExtractError;

/// Optical character recognition over a grayscale page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError>;
}

/// Renders PDF pages to images for OCR.
pub trait PdfRasterizer: Send + Sync {
    /// Render at most `max_pages` pages from the start of the document.
    fn rasterize(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<GrayImage>, ExtractError>;
}

/// OCR backend used when no engine is compiled in. Yields no text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _image: &GrayImage) -> Result<String, ExtractError> {
        Ok(String::new())
    }
}

/// Rasterizer used when pdfium is not compiled in. Yields no pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRasterizer;

impl PdfRasterizer for NoRasterizer {
    fn rasterize(&self, _pdf: &[u8], _max_pages: usize) -> Result<Vec<GrayImage>, ExtractError> {
        Ok(Vec::new())
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractOcr;

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::{ExtractError, GrayImage, OcrEngine};
    use image::ImageFormat;
    use leptess::LepTess;
    use std::io::Cursor;

    /// Tesseract through leptonica. A fresh engine per call keeps the type
    /// `Sync`; initialization is cheap next to recognition.
    #[derive(Debug, Clone)]
    pub struct TesseractOcr {
        languages: String,
    }

    impl TesseractOcr {
        pub fn new(languages: impl Into<String>) -> Self {
            Self {
                languages: languages.into(),
            }
        }
    }

    impl OcrEngine for TesseractOcr {
        fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError> {
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| ExtractError::Ocr(format!("failed to encode page: {}", e)))?;

            let mut engine = LepTess::new(None, &self.languages)
                .map_err(|e| ExtractError::Ocr(format!("failed to initialize tesseract: {}", e)))?;
            engine
                .set_image_from_mem(&png)
                .map_err(|e| ExtractError::Ocr(format!("failed to load page: {}", e)))?;
            engine
                .get_utf8_text()
                .map_err(|e| ExtractError::Ocr(format!("recognition failed: {}", e)))
        }
    }
}

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use super::{ExtractError, GrayImage, PdfRasterizer};
    use pdfium_render::prelude::*;

    /// Page width in pixels; roughly 200 DPI for A4.
    const RENDER_WIDTH: i32 = 1654;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct PdfiumRasterizer;

    impl PdfRasterizer for PdfiumRasterizer {
        fn rasterize(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<GrayImage>, ExtractError> {
            let bindings = Pdfium::bind_to_system_library()
                .map_err(|e| ExtractError::Rasterize(format!("pdfium unavailable: {}", e)))?;
            let pdfium = Pdfium::new(bindings);

            let document = pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| ExtractError::Rasterize(format!("failed to load PDF: {}", e)))?;

            let config = PdfRenderConfig::new().set_target_width(RENDER_WIDTH);

            let mut pages = Vec::new();
            for (index, page) in document.pages().iter().take(max_pages).enumerate() {
                match page.render_with_config(&config) {
                    Ok(bitmap) => pages.push(bitmap.as_image().to_luma8()),
                    Err(e) => {
                        tracing::warn!(page = index, error = %e, "Failed to render PDF page");
                    }
                }
            }
            Ok(pages)
        }
    }
}
