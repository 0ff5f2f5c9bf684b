//! Whole-card processing: load, globally binarize, partition, run the
//! per-cell pipeline, dispatch OCR and assemble the detection matrix, plus
//! the debug artifacts (grid overlay and composite mask).

use std::path::{Path, PathBuf};

use image::GrayImage;
use log::{debug, info};
use opencv::{
    core::{Mat, Point, Scalar, Vector, CV_8UC1},
    imgcodecs::{self, IMREAD_COLOR},
    imgproc,
    prelude::*,
};

use crate::{
    cell,
    consts::{GLOBAL_THRESHOLD, LINE_THICKNESS_DIVISOR},
    error::ProcessError,
    grid::{self, GridSpec},
    ocr::DigitReader,
};

/// The recognized text for every cell, row-major. Assembled once per card and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionMatrix {
    rows: u32,
    cols: u32,
    cells: Vec<String>,
}

impl DetectionMatrix {
    fn from_cells(rows: u32, cols: u32, cells: Vec<String>) -> Self {
        debug_assert_eq!(cells.len(), (rows * cols) as usize);
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn get(&self, row: u32, col: u32) -> &str {
        &self.cells[(row * self.cols + col) as usize]
    }

    /// Iterate over the matrix one row slice at a time.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[String]> {
        self.cells.chunks(self.cols as usize)
    }
}

/// Processes bingo card images with an injected digit reader.
pub struct CardProcessor<R> {
    reader: R,
}

impl<R: DigitReader> CardProcessor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Process one card image.
    ///
    /// Returns the detection matrix; when `save_grid_path` is given, also
    /// writes the grid overlay there and the composite mask next to it (file
    /// stem suffixed with `_bw`). Cells that cannot be cleaned or read yield
    /// empty strings; only input, engine and persistence problems are fatal.
    pub fn process(
        &mut self,
        image_path: &Path,
        spec: GridSpec,
        save_grid_path: Option<&Path>,
    ) -> Result<DetectionMatrix, ProcessError> {
        if !image_path.exists() {
            return Err(ProcessError::InputNotFound(image_path.to_path_buf()));
        }

        let color = imgcodecs::imread(&image_path.to_string_lossy(), IMREAD_COLOR)?;
        if color.empty() {
            return Err(ProcessError::UnreadableImage(image_path.to_path_buf()));
        }

        let mut gray = Mat::default();
        imgproc::cvt_color(
            &color,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
        )?;

        // Global foreground map: dark print becomes white (255).
        let mut binarized = Mat::default();
        imgproc::threshold(
            &gray,
            &mut binarized,
            GLOBAL_THRESHOLD,
            255.0,
            imgproc::THRESH_BINARY_INV,
        )?;

        let width = binarized.cols();
        let height = binarized.rows();
        debug!(
            "processing {}x{} image as {}x{} grid",
            width,
            height,
            spec.rows(),
            spec.cols()
        );

        let mut composite_mask = Mat::zeros(height, width, CV_8UC1)?.to_mat()?;
        let mut texts = Vec::with_capacity((spec.rows() * spec.cols()) as usize);

        for region in grid::partition(width, height, &spec) {
            if region.is_degenerate() {
                debug!(
                    "cell ({},{}) is degenerate, skipping",
                    region.row, region.col
                );
                texts.push(String::new());
                continue;
            }

            let slice = Mat::roi(&binarized, region.inner)?.try_clone()?;
            let views = cell::clean_cell(slice)?;

            // The display view lands in the composite mask at the cell's own
            // coordinates; regions never overlap.
            let mut mask_target = Mat::roi_mut(&mut composite_mask, region.inner)?;
            views.display.copy_to(&mut mask_target)?;

            let ocr_input = cell::invert_for_ocr(&views.ocr)?;
            let text = self.reader.read_digits(&mat_to_gray(&ocr_input)?)?;
            debug!("cell ({},{}) -> {text:?}", region.row, region.col);
            texts.push(text);
        }

        if let Some(overlay_path) = save_grid_path {
            let mut overlay = color.try_clone()?;
            draw_grid_lines(&mut overlay, &spec, width, height)?;

            let mut mask_bgr = Mat::default();
            imgproc::cvt_color(
                &composite_mask,
                &mut mask_bgr,
                imgproc::COLOR_GRAY2BGR,
                0,
            )?;
            draw_grid_lines(&mut mask_bgr, &spec, width, height)?;

            let mask_path = mask_output_path(overlay_path);
            imgcodecs::imwrite(&overlay_path.to_string_lossy(), &overlay, &Vector::default())?;
            imgcodecs::imwrite(&mask_path.to_string_lossy(), &mask_bgr, &Vector::default())?;
            info!(
                "saved grid overlay to {} and composite mask to {}",
                overlay_path.display(),
                mask_path.display()
            );
        }

        Ok(DetectionMatrix::from_cells(spec.rows(), spec.cols(), texts))
    }
}

/// Draw red separator lines at every internal row/column boundary.
fn draw_grid_lines(
    img: &mut Mat,
    spec: &GridSpec,
    width: i32,
    height: i32,
) -> opencv::Result<()> {
    let cell_w = spec.cell_width(width);
    let cell_h = spec.cell_height(height);
    let thickness = (width.min(height) / LINE_THICKNESS_DIVISOR).max(1);
    let red = Scalar::new(0.0, 0.0, 255.0, 0.0);

    for col in 1..spec.cols() as i32 {
        let x = col * cell_w;
        imgproc::line(
            img,
            Point::new(x, 0),
            Point::new(x, height),
            red,
            thickness,
            imgproc::LINE_8,
            0,
        )?;
    }
    for row in 1..spec.rows() as i32 {
        let y = row * cell_h;
        imgproc::line(
            img,
            Point::new(0, y),
            Point::new(width, y),
            red,
            thickness,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}

/// Composite-mask path: the overlay's file stem suffixed with `_bw`.
fn mask_output_path(overlay_path: &Path) -> PathBuf {
    let stem = overlay_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("grid");
    let name = match overlay_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_bw.{ext}"),
        None => format!("{stem}_bw"),
    };
    overlay_path.with_file_name(name)
}

fn mat_to_gray(mat: &Mat) -> Result<GrayImage, ProcessError> {
    let data = mat.data_bytes()?.to_vec();
    GrayImage::from_raw(mat.cols() as u32, mat.rows() as u32, data)
        .ok_or_else(|| ProcessError::Ocr("cell buffer does not match its dimensions".into()))
}
