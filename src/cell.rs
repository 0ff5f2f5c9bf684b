//! Per-cell cleanup pipeline.
//!
//! A cell slice arrives pre-binarized by the global pass but is re-thresholded
//! locally (Otsu) because a single global threshold fails under uneven
//! lighting. The cleanup stages after that are: median blur, morphological
//! open/close, small-component suppression, border-seeded flood fill and
//! polarity correction, and finally the top-strip masking that produces the
//! OCR view and the display view.
//!
//! Every stage degrades gracefully: if an OpenCV call fails on a degenerate
//! slice the stage keeps its input instead of aborting the grid.

use log::debug;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, CV_32S},
    imgproc,
    prelude::*,
};

use crate::consts::{
    COMPONENT_AREA_DIVISOR, KERNEL_DIVISOR, MEDIAN_BLUR_KSIZE, MIN_COMPONENT_AREA,
    TOP_STRIP_FRACTION,
};

/// The two views produced for one cell: what the OCR engine reads and what
/// goes into the composite debug mask. Same dimensions as the input cell.
pub struct CellViews {
    pub ocr: Mat,
    pub display: Mat,
}

/// Run the full cleanup on one cell slice and split it into views.
pub fn clean_cell(cell: Mat) -> opencv::Result<CellViews> {
    let cell = normalize_cell(cell);
    let cell = erase_border_regions(cell);
    let cell = correct_polarity(cell)?;
    split_views(&cell)
}

/// Otsu binarization, median blur, open/close morphology and small-component
/// suppression. Output has the input's dimensions and values in {0, 255}.
pub fn normalize_cell(cell: Mat) -> Mat {
    let cell = match otsu_binarize(&cell) {
        Ok(bw) => bw,
        Err(err) => {
            debug!("Otsu binarization skipped: {err}");
            cell
        }
    };

    let min_dim = cell.rows().min(cell.cols());

    let cell = if min_dim >= MEDIAN_BLUR_KSIZE {
        match median_blur(&cell) {
            Ok(blurred) => blurred,
            Err(err) => {
                debug!("median blur skipped: {err}");
                cell
            }
        }
    } else {
        cell
    };

    let kernel_side = (min_dim / KERNEL_DIVISOR).max(1);
    let cell = match open_close(&cell, kernel_side) {
        Ok(cleaned) => cleaned,
        Err(err) => {
            debug!("morphology skipped: {err}");
            cell
        }
    };

    match suppress_small_components(&cell) {
        Ok(filtered) => filtered,
        Err(err) => {
            debug!("component filter skipped: {err}");
            cell
        }
    }
}

fn otsu_binarize(cell: &Mat) -> opencv::Result<Mat> {
    let mut bw = Mat::default();
    imgproc::threshold(
        cell,
        &mut bw,
        0.0,
        255.0,
        imgproc::THRESH_BINARY | imgproc::THRESH_OTSU,
    )?;
    Ok(bw)
}

fn median_blur(cell: &Mat) -> opencv::Result<Mat> {
    let mut blurred = Mat::default();
    imgproc::median_blur(cell, &mut blurred, MEDIAN_BLUR_KSIZE)?;
    Ok(blurred)
}

/// Opening removes small protrusions, closing then fills small gaps in digit
/// strokes. Open must run first so closing does not seal noise back in.
fn open_close(cell: &Mat, kernel_side: i32) -> opencv::Result<Mat> {
    let kernel = imgproc::get_structuring_element(
        imgproc::MORPH_RECT,
        Size::new(kernel_side, kernel_side),
        Point::new(-1, -1),
    )?;

    let mut opened = Mat::default();
    imgproc::morphology_ex(
        cell,
        &mut opened,
        imgproc::MORPH_OPEN,
        &kernel,
        Point::new(-1, -1),
        1,
        core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    let mut closed = Mat::default();
    imgproc::morphology_ex(
        &opened,
        &mut closed,
        imgproc::MORPH_CLOSE,
        &kernel,
        Point::new(-1, -1),
        1,
        core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;
    Ok(closed)
}

/// Erase 8-connected foreground components smaller than the cell-size-scaled
/// speckle threshold. The threshold scales with the cell area because a fixed
/// constant would either pass noise on large cells or eat digit strokes on
/// small ones.
fn suppress_small_components(cell: &Mat) -> opencv::Result<Mat> {
    let mut labels = Mat::default();
    let mut stats = Mat::default();
    let mut centroids = Mat::default();
    let label_count = imgproc::connected_components_with_stats(
        cell,
        &mut labels,
        &mut stats,
        &mut centroids,
        8,
        CV_32S,
    )?;

    let min_area = (cell.rows() * cell.cols() / COMPONENT_AREA_DIVISOR).max(MIN_COMPONENT_AREA);

    // Label 0 is the background; it is never kept.
    let mut keep = vec![false; label_count.max(1) as usize];
    for label in 1..label_count {
        let area = *stats.at_2d::<i32>(label, imgproc::CC_STAT_AREA)?;
        keep[label as usize] = area >= min_area;
    }

    let mut cleaned = Mat::zeros(cell.rows(), cell.cols(), cell.typ())?.to_mat()?;
    for y in 0..cell.rows() {
        for x in 0..cell.cols() {
            let label = *labels.at_2d::<i32>(y, x)?;
            if keep[label as usize] {
                *cleaned.at_2d_mut::<u8>(y, x)? = 255;
            }
        }
    }
    Ok(cleaned)
}

/// Flood-fill background regions touching the cell border to 0.
///
/// Digits never touch the border (the partitioner's padding guarantees it),
/// so any foreground region reachable from an edge is separator-line bleed or
/// card texture, not signal. Seeds are taken from all four edges; fill uses
/// 8-connectivity. On failure the input is kept.
pub fn erase_border_regions(cell: Mat) -> Mat {
    let scratch = match cell.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            debug!("border flood fill skipped: {err}");
            return cell;
        }
    };
    match flood_fill_border(scratch) {
        Ok(flooded) => flooded,
        Err(err) => {
            debug!("border flood fill skipped: {err}");
            cell
        }
    }
}

fn flood_fill_border(mut cell: Mat) -> opencv::Result<Mat> {
    let rows = cell.rows();
    let cols = cell.cols();
    if rows == 0 || cols == 0 {
        return Ok(cell);
    }

    let fill_from = |x: i32, y: i32, cell: &mut Mat| -> opencv::Result<()> {
        if *cell.at_2d::<u8>(y, x)? == 255 {
            let mut rect = Rect::default();
            imgproc::flood_fill(
                cell,
                Point::new(x, y),
                Scalar::all(0.0),
                &mut rect,
                Scalar::default(),
                Scalar::default(),
                8,
            )?;
        }
        Ok(())
    };

    for x in 0..cols {
        fill_from(x, 0, &mut cell)?;
        fill_from(x, rows - 1, &mut cell)?;
    }
    for y in 0..rows {
        fill_from(0, y, &mut cell)?;
        fill_from(cols - 1, y, &mut cell)?;
    }
    Ok(cell)
}

/// Ensure foreground (255) is the majority value. Downstream convention is
/// "digit pixels are white"; a majority-black cell is inverted wholesale.
/// This is a binary decision with no confidence fallback: a card design with
/// genuinely more white than black background would be mis-inverted.
pub fn correct_polarity(cell: Mat) -> opencv::Result<Mat> {
    let total = cell.rows() * cell.cols();
    if total == 0 {
        return Ok(cell);
    }
    let white = core::count_non_zero(&cell)?;
    let black = total - white;
    if white < black {
        let mut inverted = Mat::default();
        core::bitwise_not(&cell, &mut inverted, &Mat::default())?;
        Ok(inverted)
    } else {
        Ok(cell)
    }
}

/// Produce the OCR and display views by masking the top strip of the cell.
///
/// Cards carry a decorative letter in the upper part of each cell; the OCR
/// view blanks it to background so it cannot pollute recognition, while the
/// display view paints it solid white so the composite mask reads cleanly.
pub fn split_views(cell: &Mat) -> opencv::Result<CellViews> {
    let rows = cell.rows();
    let cols = cell.cols();
    let strip_h = ((rows as f64 * TOP_STRIP_FRACTION) as i32).max(1).min(rows);

    let mut ocr = cell.try_clone()?;
    let mut display = cell.try_clone()?;
    if cols > 0 && strip_h > 0 {
        let strip = Rect::new(0, 0, cols, strip_h);
        Mat::roi_mut(&mut ocr, strip)?.set_to(&Scalar::all(0.0), &Mat::default())?;
        Mat::roi_mut(&mut display, strip)?.set_to(&Scalar::all(255.0), &Mat::default())?;
    }
    Ok(CellViews { ocr, display })
}

/// Invert a view for recognition: the OCR engine expects dark glyphs on a
/// light field.
pub fn invert_for_ocr(view: &Mat) -> opencv::Result<Mat> {
    let mut inverted = Mat::default();
    core::bitwise_not(view, &mut inverted, &Mat::default())?;
    Ok(inverted)
}
