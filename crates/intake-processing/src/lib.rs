//! Intake Processing Library
//!
//! CPU-bound document work: archive expansion, content-type resolution, text
//! extraction (PDF text layer, tolerant parse, OCR; DOCX; images) and chunking.

pub mod archive;
pub mod chunking;
pub mod content_type;
pub mod extract;
pub mod orientation;

// Re-export commonly used types
pub use archive::{
    ArchiveError, ArchiveFormat, ArchiveLimits, ArchiveMember, ArchiveMembers, ArchiveReader,
};
pub use chunking::TextChunker;
pub use content_type::resolve_content_type;
pub use extract::ocr::{NoOcr, NoRasterizer, OcrEngine, PdfRasterizer};
#[cfg(feature = "pdfium")]
pub use extract::ocr::PdfiumRasterizer;
#[cfg(feature = "tesseract")]
pub use extract::ocr::TesseractOcr;
pub use extract::{DocumentFamily, ExtractError, TextExtractor};
