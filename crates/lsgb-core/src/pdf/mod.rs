//! PDF collaborator access: per-page text, page rasters and a digital
//! signature check, built on lopdf and pdf-extract.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF access implementations.
///
/// The pipeline only talks to this trait, which keeps it testable without
/// real PDF fixtures.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Number of pages in the loaded document.
    fn page_count(&self) -> u32;

    /// Extract embedded text from the entire document.
    fn extract_text(&self) -> Result<String>;

    /// Extract embedded text for a single page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// The raster for a page (1-indexed): the largest embedded image,
    /// which for scanned documents is the page scan itself.
    fn page_raster(&self, page: u32) -> Result<DynamicImage>;

    /// All embedded images on a page (1-indexed).
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;

    /// Whether the document carries a digital signature field. Digitally
    /// signed documents skip the visual stamp/signature verification.
    fn has_digital_signature(&self) -> bool;
}
