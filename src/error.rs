use std::path::PathBuf;

use crate::ocr::OcrError;

/// Errors that abort processing of a whole card.
///
/// Per-cell cleanup failures are not represented here: they are absorbed by
/// keeping the pre-step image, and at worst leave an empty string in the
/// detection matrix.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("input image not found: {0}")]
    InputNotFound(PathBuf),

    #[error("could not decode image: {0}")]
    UnreadableImage(PathBuf),

    #[error("grid dimensions {rows}x{cols} out of range, rows and cols must be within 1..={max}")]
    InvalidGridDimensions { rows: u32, cols: u32, max: u32 },

    #[error("OCR engine unavailable: {0}")]
    OcrEngineUnavailable(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("image operation failed: {0}")]
    Vision(#[from] opencv::Error),
}

impl From<OcrError> for ProcessError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::EngineUnavailable(msg) => ProcessError::OcrEngineUnavailable(msg),
            OcrError::Recognition(msg) => ProcessError::Ocr(msg),
        }
    }
}
