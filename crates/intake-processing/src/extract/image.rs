use super::ocr::OcrEngine;
use super::ExtractError;
use crate::orientation::apply_exif_orientation;

/// Decode, upright, grayscale, then OCR.
pub(crate) fn ocr_image_bytes(data: &[u8], ocr: &dyn OcrEngine) -> Result<String, ExtractError> {
    let img = image::load_from_memory(data).map_err(|e| ExtractError::Image(e.to_string()))?;
    let img = apply_exif_orientation(img, data);
    let gray = img.to_luma8();
    ocr.recognize(&gray)
}

pub(crate) fn extract_image(data: &[u8], ocr: &dyn OcrEngine) -> Result<String, ExtractError> {
    ocr_image_bytes(data, ocr).map(|text| text.trim().to_string())
}
