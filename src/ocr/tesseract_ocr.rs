//! Tesseract-backed digit reader.

use image::GrayImage;
use log::debug;
use tesseract::Tesseract;

use super::{DigitReader, OcrError};
use crate::consts::DIGIT_WHITELIST;

/// Page segmentation mode 7: treat the cell as a single text line.
const PAGE_SEG_MODE: &str = "7";

/// Nominal input resolution reported to Tesseract. Cell crops carry no DPI
/// metadata and the engine degrades badly when it assumes 0 dpi.
const SOURCE_PPI: i32 = 300;

/// Reads digits from cell images via Tesseract.
///
/// Construction probes the engine once: if the backing library or language
/// data cannot be loaded, `EngineUnavailable` surfaces before any image work,
/// and the caller treats it as fatal for the whole card.
pub struct TesseractDigitReader {
    language: String,
}

impl TesseractDigitReader {
    pub fn new() -> Result<Self, OcrError> {
        Self::with_language("eng")
    }

    pub fn with_language(language: &str) -> Result<Self, OcrError> {
        // Probe now so a missing engine is reported up front, not midway
        // through a grid.
        Tesseract::new(None, Some(language)).map_err(|err| {
            OcrError::EngineUnavailable(format!(
                "failed to initialize Tesseract ({err}); is it installed with '{language}' data?"
            ))
        })?;
        Ok(Self {
            language: language.to_string(),
        })
    }

    fn encode_png(cell: &GrayImage) -> Result<Vec<u8>, OcrError> {
        let mut png = Vec::new();
        cell.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .map_err(|err| OcrError::Recognition(format!("PNG encoding failed: {err}")))?;
        Ok(png)
    }
}

impl DigitReader for TesseractDigitReader {
    fn read_digits(&mut self, cell: &GrayImage) -> Result<String, OcrError> {
        let png = Self::encode_png(cell)?;

        // The tesseract API consumes self on every configuration step, so a
        // fresh instance per cell is the simplest ownership story.
        let mut engine = Tesseract::new(None, Some(&self.language))
            .map_err(|err| OcrError::EngineUnavailable(err.to_string()))?
            .set_variable("tessedit_char_whitelist", DIGIT_WHITELIST)
            .map_err(|err| OcrError::Recognition(err.to_string()))?
            .set_variable("tessedit_pageseg_mode", PAGE_SEG_MODE)
            .map_err(|err| OcrError::Recognition(err.to_string()))?
            .set_image_from_mem(&png)
            .map_err(|err| OcrError::Recognition(err.to_string()))?
            .set_source_resolution(SOURCE_PPI)
            .recognize()
            .map_err(|err| OcrError::Recognition(err.to_string()))?;

        let text = engine
            .get_text()
            .map_err(|err| OcrError::Recognition(err.to_string()))?;
        let text = text.trim().to_string();
        debug!("cell {}x{} read as {text:?}", cell.width(), cell.height());
        Ok(text)
    }
}
