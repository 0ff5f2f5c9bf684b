//! Grid geometry: validated dimensions and row-major cell regions.

use opencv::core::Rect;

use crate::consts::{CELL_PAD_FRACTION, CELL_PAD_MIN, MAX_GRID_DIM};
use crate::error::ProcessError;

/// Validated grid dimensions. Construction rejects out-of-range values, so a
/// `GridSpec` in hand means no further bounds checking is needed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    rows: u32,
    cols: u32,
}

impl GridSpec {
    /// Rows and cols must each be within `1..=MAX_GRID_DIM`. This runs before
    /// any image work, so bad dimensions never reach the decoder.
    pub fn new(rows: u32, cols: u32) -> Result<Self, ProcessError> {
        if rows < 1 || rows > MAX_GRID_DIM || cols < 1 || cols > MAX_GRID_DIM {
            return Err(ProcessError::InvalidGridDimensions {
                rows,
                cols,
                max: MAX_GRID_DIM,
            });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Cell height for an image of the given height, truncating. The
    /// remainder border at the bottom/right is discarded by design.
    pub fn cell_height(&self, image_height: i32) -> i32 {
        image_height / self.rows as i32
    }

    pub fn cell_width(&self, image_width: i32) -> i32 {
        image_width / self.cols as i32
    }
}

/// One cell of the grid, in full-image coordinates.
///
/// `outer` is the raw cell box; `inner` is the box shrunk by a small margin on
/// each side so separator-line pixels do not leak into the cell. When the
/// margin would collapse the box to nothing (tiny cells), `inner` falls back
/// to `outer`.
#[derive(Debug, Clone, Copy)]
pub struct CellRegion {
    pub row: u32,
    pub col: u32,
    pub outer: Rect,
    pub inner: Rect,
}

impl CellRegion {
    /// A degenerate region has no pixels to read; the cell can only yield an
    /// empty detection.
    pub fn is_degenerate(&self) -> bool {
        self.inner.width <= 0 || self.inner.height <= 0
    }
}

/// Split an image of `width`x`height` into `spec.rows() * spec.cols()` cell
/// regions in row-major order.
pub fn partition(width: i32, height: i32, spec: &GridSpec) -> Vec<CellRegion> {
    let cell_w = spec.cell_width(width);
    let cell_h = spec.cell_height(height);

    let pad_x = ((cell_w as f64 * CELL_PAD_FRACTION) as i32).max(CELL_PAD_MIN);
    let pad_y = ((cell_h as f64 * CELL_PAD_FRACTION) as i32).max(CELL_PAD_MIN);

    let mut regions = Vec::with_capacity((spec.rows() * spec.cols()) as usize);
    for row in 0..spec.rows() {
        for col in 0..spec.cols() {
            let x0 = col as i32 * cell_w;
            let y0 = row as i32 * cell_h;
            let outer = Rect::new(x0, y0, cell_w, cell_h);

            let xa = (x0 + pad_x).max(0);
            let ya = (y0 + pad_y).max(0);
            let xb = (x0 + cell_w - pad_x).min(width);
            let yb = (y0 + cell_h - pad_y).min(height);

            let inner = if xb > xa && yb > ya {
                Rect::new(xa, ya, xb - xa, yb - ya)
            } else {
                outer
            };

            regions.push(CellRegion {
                row,
                col,
                outer,
                inner,
            });
        }
    }
    regions
}
