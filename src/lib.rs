pub mod cell;
pub mod error;
pub mod grid;
pub mod ocr;
pub mod processor;

pub mod consts {
    /// Fixed threshold for the global inverse binarization pass. Pixels at or
    /// below this become foreground (255).
    pub const GLOBAL_THRESHOLD: f64 = 150.0;

    /// Inclusive upper bound for grid rows and columns. Lower bound is 1.
    pub const MAX_GRID_DIM: u32 = 10;

    /// Inward padding per cell side, as a fraction of the cell dimension.
    pub const CELL_PAD_FRACTION: f64 = 0.05;

    /// Minimum inward padding per cell side, in pixels.
    pub const CELL_PAD_MIN: i32 = 2;

    /// The morphological structuring element side is
    /// min(cell_h, cell_w) / KERNEL_DIVISOR, at least 1.
    pub const KERNEL_DIVISOR: i32 = 30;

    /// Median blur aperture; only applied when the smaller cell dimension is
    /// at least this large.
    pub const MEDIAN_BLUR_KSIZE: i32 = 3;

    /// Connected components with area below
    /// max(MIN_COMPONENT_AREA, cell_area / COMPONENT_AREA_DIVISOR) are erased
    /// as speckle noise.
    pub const MIN_COMPONENT_AREA: i32 = 8;
    pub const COMPONENT_AREA_DIVISOR: i32 = 500;

    /// Fraction of the cell height blanked before recognition to suppress
    /// decorative card art above the digit.
    pub const TOP_STRIP_FRACTION: f64 = 0.35;

    /// Grid line thickness is min(width, height) / LINE_THICKNESS_DIVISOR,
    /// at least 1.
    pub const LINE_THICKNESS_DIVISOR: i32 = 200;

    /// Characters the OCR engine is allowed to recognize.
    pub const DIGIT_WHITELIST: &str = "0123456789";

    /// Input file extensions accepted by the CLI.
    pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];
}
