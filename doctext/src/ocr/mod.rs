//! OCR (Optical Character Recognition) Module
//!
//! Turns pages that carry no machine-readable text into text. Two seams are
//! involved, each behind a trait so the PDF path can be exercised without
//! native tooling:
//!
//! - [`Rasterizer`] renders one PDF page to a PNG image at a fixed resolution
//!   ([`PdftoppmRasterizer`] shells out to poppler's `pdftoppm`)
//! - [`TextRecognizer`] reads text from an image ([`OcrProvider`] wraps
//!   Tesseract via leptess)
//!
//! # Configuration
//!
//! OCR behavior is controlled via `OcrConfig` (see `config.rs`):
//! - `languages`: `+`-joined Tesseract language codes (default `eng`)
//! - `tessdata_path`: optional traineddata directory
//! - `dpi`: rasterization resolution (default 300)
//! - `rasterizer`: page renderer executable (default `pdftoppm`)

mod provider;
mod raster;

use std::path::Path;

use crate::error::Result;

pub use provider::OcrProvider;
pub use raster::PdftoppmRasterizer;

/// Recognizes text in an encoded image (PNG, JPEG, ...).
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Renders a single page of a PDF file to PNG bytes.
///
/// `page_number` is 1-based. Intermediate files go into `scratch_dir`, which
/// the caller owns and removes.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path, page_number: usize, scratch_dir: &Path) -> Result<Vec<u8>>;

    fn dpi(&self) -> u32;

    fn is_available(&self) -> bool {
        true
    }
}
