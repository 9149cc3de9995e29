//! Core library for delivery-note and confirmation-of-receipt processing.
//!
//! This crate provides:
//! - PDF collaborator access (per-page text, page rasters, signature check)
//! - OCR-error tolerant token normalization
//! - Delivery-note candidate classification with auto-correction
//! - Anchor-based confirmation-of-receipt identifier location
//! - Page grouping by identifier
//! - Stamp/signature/date region analysis on page rasters

pub mod error;
pub mod models;
pub mod normalize;
pub mod delivery;
pub mod receipt;
pub mod region;
pub mod pdf;
pub mod ocr;
pub mod pipeline;

pub use error::{LsgbError, Result};
pub use models::config::LsgbConfig;
pub use models::manifest::{DocumentStatus, ManifestRow};
pub use normalize::{collapse_digit_runs, normalize};
pub use delivery::{Candidate, ClassificationResult, classify, extract_candidates};
pub use receipt::{Confidence, IdentifierMatch, IdentifierType, SourceStrategy};
pub use receipt::grouper::{GroupingOutcome, PageGroup, PageRecord, group_pages};
pub use receipt::locator::IdentifierLocator;
pub use region::{
    FeatureStatus, OverallStatus, RasterBuffer, RegionAnalyzer, RegionMeasurements,
    RegionVerification,
};
pub use pdf::{PdfExtractor, PdfProcessor};
pub use ocr::OcrEngine;
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pipeline::{DocumentPipeline, DocumentReport, GroupReport, PipelineMode};
