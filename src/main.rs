use std::path::PathBuf;

use anyhow::Result;
use bingo_card_ocr::{
    consts::ALLOWED_EXTENSIONS,
    grid::GridSpec,
    ocr::tesseract_ocr::TesseractDigitReader,
    processor::CardProcessor,
};
use clap::Parser;
use log::info;

/// Bingo card OCR - extract the numbers from a photographed card
#[derive(Parser, Debug)]
#[command(name = "bingo_card_ocr")]
#[command(about = "Extract digits from a bingo card image as a rows x cols grid", long_about = None)]
struct Args {
    /// Path to the card image (.png, .jpg, .jpeg, .bmp or .tiff)
    image: PathBuf,

    /// Number of grid rows (1-10)
    #[arg(short = 'r', long, default_value = "5")]
    rows: u32,

    /// Number of grid columns (1-10)
    #[arg(short = 'c', long, default_value = "5")]
    cols: u32,

    /// Save a grid overlay of the original image at this path; the composite
    /// mask is written next to it with a "_bw" suffix
    #[arg(short = 's', long)]
    save_grid: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .filter(Some("bingo_card_ocr"), log::LevelFilter::Debug)
        .init();

    let args = Args::parse();

    let extension = args
        .image
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        anyhow::bail!(
            "unsupported file extension '{}', use one of: {}",
            extension,
            ALLOWED_EXTENSIONS.join(", ")
        );
    }

    let spec = GridSpec::new(args.rows, args.cols)?;

    // Resolve the OCR capability up front; a missing engine aborts before any
    // image work.
    let reader = TesseractDigitReader::new()?;
    let mut processor = CardProcessor::new(reader);

    info!(
        "processing {} as a {}x{} grid",
        args.image.display(),
        args.rows,
        args.cols
    );
    let matrix = processor.process(&args.image, spec, args.save_grid.as_deref())?;

    for row in matrix.iter_rows() {
        println!("{}", row.join(" | "));
    }

    Ok(())
}
