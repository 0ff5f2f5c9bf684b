//! OCR capability boundary.
//!
//! The pipeline only needs one thing from an engine: given a binary cell
//! image, return the digits it shows. Engines are handed in by the caller
//! after a one-time resolution step, so the core holds no engine paths or
//! other environment-dependent state.

use image::GrayImage;

pub mod tesseract_ocr;

/// Errors an OCR engine can report. "The engine itself is missing" must stay
/// distinguishable from "this cell produced nothing", so callers can abort a
/// whole grid on the former and keep going on the latter.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// A digit reader for cleaned cell images.
///
/// The input is a binary image with dark glyphs on a light field; the result
/// is the trimmed recognized text, possibly empty. Implementations are
/// expected to restrict recognition to the digits 0-9.
pub trait DigitReader {
    fn read_digits(&mut self, cell: &GrayImage) -> Result<String, OcrError>;
}
