use std::path::Path;

use anyhow::Result;
use bingo_card_ocr::{
    error::ProcessError,
    grid::GridSpec,
    ocr::{DigitReader, OcrError},
    processor::CardProcessor,
};
use image::GrayImage;
use opencv::{
    core::{Mat, Scalar, Vec3b, Vector, CV_8UC3},
    imgcodecs::{self, IMREAD_COLOR},
    prelude::*,
};

/// Reader that records how many cells it saw and always reads nothing.
#[derive(Default)]
struct EmptyReader {
    calls: usize,
}

impl DigitReader for EmptyReader {
    fn read_digits(&mut self, _cell: &GrayImage) -> Result<String, OcrError> {
        self.calls += 1;
        Ok(String::new())
    }
}

/// Reader that fingerprints its input so two runs over the same image can be
/// compared cell by cell.
struct FingerprintReader;

impl DigitReader for FingerprintReader {
    fn read_digits(&mut self, cell: &GrayImage) -> Result<String, OcrError> {
        let foreground = cell.pixels().filter(|p| p.0[0] > 127).count();
        Ok(format!("{}x{}:{}", cell.width(), cell.height(), foreground))
    }
}

/// Reader standing in for a Tesseract install that is missing entirely.
struct UnavailableReader;

impl DigitReader for UnavailableReader {
    fn read_digits(&mut self, _cell: &GrayImage) -> Result<String, OcrError> {
        Err(OcrError::EngineUnavailable("engine not found".into()))
    }
}

/// Write a white card with a few dark digit-sized blobs to `path`.
fn write_card(path: &Path, blobs: &[(i32, i32)]) -> Result<()> {
    let mut img =
        Mat::new_rows_cols_with_default(500, 500, CV_8UC3, Scalar::all(255.0))?;
    for &(y0, x0) in blobs {
        for y in y0..y0 + 30 {
            for x in x0..x0 + 20 {
                *img.at_2d_mut::<Vec3b>(y, x)? = Vec3b::all(0);
            }
        }
    }
    imgcodecs::imwrite(&path.to_string_lossy(), &img, &Vector::default())?;
    Ok(())
}

fn write_blank_card(path: &Path) -> Result<()> {
    write_card(path, &[])
}

#[test]
fn matrix_has_requested_shape_and_visits_every_cell() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_blank_card(&card)?;

    let mut processor = CardProcessor::new(EmptyReader::default());
    let matrix = processor.process(&card, GridSpec::new(5, 5)?, None)?;

    assert_eq!(matrix.rows(), 5);
    assert_eq!(matrix.cols(), 5);
    assert_eq!(matrix.iter_rows().count(), 5);
    for row in matrix.iter_rows() {
        assert_eq!(row.len(), 5);
        assert!(row.iter().all(String::is_empty));
    }
    Ok(())
}

#[test]
fn every_cell_is_dispatched_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_blank_card(&card)?;

    let mut processor = CardProcessor::new(EmptyReader::default());
    processor.process(&card, GridSpec::new(3, 4)?, None)?;
    assert_eq!(processor.into_reader().calls, 12);
    Ok(())
}

#[test]
fn non_square_grids_are_supported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_blank_card(&card)?;

    let mut processor = CardProcessor::new(EmptyReader::default());
    for (rows, cols) in [(1, 1), (1, 10), (10, 1), (7, 3)] {
        let matrix = processor.process(&card, GridSpec::new(rows, cols)?, None)?;
        assert_eq!(matrix.rows(), rows);
        assert_eq!(matrix.cols(), cols);
    }
    Ok(())
}

#[test]
fn out_of_range_dimensions_are_rejected_before_any_decode() {
    // The path does not exist; dimension validation must fire first, which
    // the GridSpec type enforces by construction.
    let err = GridSpec::new(11, 5).unwrap_err();
    assert!(matches!(
        err,
        ProcessError::InvalidGridDimensions { rows: 11, cols: 5, .. }
    ));
}

#[test]
fn missing_input_reports_not_found_and_writes_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let overlay = dir.path().join("grid.png");

    let mut processor = CardProcessor::new(EmptyReader::default());
    let err = processor
        .process(
            &dir.path().join("no_such_card.png"),
            GridSpec::new(5, 5)?,
            Some(&overlay),
        )
        .unwrap_err();

    assert!(matches!(err, ProcessError::InputNotFound(_)));
    assert!(!overlay.exists());
    assert!(!dir.path().join("grid_bw.png").exists());
    Ok(())
}

#[test]
fn undecodable_input_reports_unreadable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fake = dir.path().join("fake.png");
    std::fs::write(&fake, b"this is not an image")?;

    let mut processor = CardProcessor::new(EmptyReader::default());
    let err = processor
        .process(&fake, GridSpec::new(5, 5)?, None)
        .unwrap_err();
    assert!(matches!(err, ProcessError::UnreadableImage(_)));
    Ok(())
}

#[test]
fn unavailable_engine_fails_the_whole_grid() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_card(&card, &[(230, 240)])?;

    let mut processor = CardProcessor::new(UnavailableReader);
    let err = processor
        .process(&card, GridSpec::new(5, 5)?, None)
        .unwrap_err();
    assert!(matches!(err, ProcessError::OcrEngineUnavailable(_)));
    Ok(())
}

#[test]
fn requested_artifacts_are_written_with_matching_dimensions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_card(&card, &[(130, 140), (330, 340)])?;
    let overlay = dir.path().join("grid.png");

    let mut processor = CardProcessor::new(EmptyReader::default());
    processor.process(&card, GridSpec::new(5, 5)?, Some(&overlay))?;

    let mask = dir.path().join("grid_bw.png");
    assert!(overlay.exists());
    assert!(mask.exists());

    let overlay_img = imgcodecs::imread(&overlay.to_string_lossy(), IMREAD_COLOR)?;
    let mask_img = imgcodecs::imread(&mask.to_string_lossy(), IMREAD_COLOR)?;
    assert_eq!((overlay_img.cols(), overlay_img.rows()), (500, 500));
    assert_eq!((mask_img.cols(), mask_img.rows()), (500, 500));
    Ok(())
}

#[test]
fn no_artifacts_without_a_save_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_blank_card(&card)?;

    let mut processor = CardProcessor::new(EmptyReader::default());
    processor.process(&card, GridSpec::new(5, 5)?, None)?;

    let entries: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    assert_eq!(entries, ["card.png"]);
    Ok(())
}

#[test]
fn pipeline_is_deterministic_for_a_fixed_image_and_spec() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let card = dir.path().join("card.png");
    write_card(&card, &[(130, 140), (230, 240), (430, 40)])?;
    let spec = GridSpec::new(5, 5)?;

    let first = CardProcessor::new(FingerprintReader).process(&card, spec, None)?;
    let second = CardProcessor::new(FingerprintReader).process(&card, spec, None)?;
    assert_eq!(first, second);

    // The fingerprints prove the OCR views are real images of cell size.
    let inner_w = 100 - 10; // 5% padding on each side of a 100px cell
    let inner_h = 100 - 10;
    for row in first.iter_rows() {
        for text in row {
            assert!(text.starts_with(&format!("{inner_w}x{inner_h}:")));
        }
    }
    Ok(())
}
