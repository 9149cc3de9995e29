//! Stamp, signature and date verification on page rasters.
//!
//! Confirmation pages are verified by looking at fixed regions of the
//! scanned page: the bottom-right quadrant for the company stamp and
//! handwritten signature, the bottom-left for the handwritten date. The
//! analysis is purely heuristic pixel statistics, no ML involved.

pub mod analyzer;

use serde::{Deserialize, Serialize};

pub use analyzer::RegionAnalyzer;

/// Read access to a page raster.
///
/// Abstracting over the pixel source keeps the analyzer testable with
/// synthetic buffers and independent of how the raster was produced.
pub trait RasterBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Pixel color as `[r, g, b]`.
    fn pixel(&self, x: u32, y: u32) -> [u8; 3];
}

impl RasterBuffer for image::RgbImage {
    fn width(&self) -> u32 {
        image::RgbImage::width(self)
    }

    fn height(&self) -> u32 {
        image::RgbImage::height(self)
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.get_pixel(x, y).0
    }
}

/// Three-way verdict for a single page feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    Present,
    Uncertain,
    Missing,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Present => "present",
            FeatureStatus::Uncertain => "uncertain",
            FeatureStatus::Missing => "missing",
        }
    }
}

impl std::fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined verdict for a verified page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Stamp, signature and date all present.
    Complete,
    /// Stamp and signature present, date field empty.
    DateMissing,
    /// Signature present without a stamp.
    StampMissing,
    /// Stamp present without a signature.
    SignatureMissing,
    /// Neither stamp nor signature found.
    BothMissing,
    /// At least one feature landed in the uncertain band.
    NeedsReview,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Complete => "complete",
            OverallStatus::DateMissing => "date_missing",
            OverallStatus::StampMissing => "stamp_missing",
            OverallStatus::SignatureMissing => "signature_missing",
            OverallStatus::BothMissing => "both_missing",
            OverallStatus::NeedsReview => "needs_review",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw densities measured during analysis, kept for reporting and
/// threshold tuning.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegionMeasurements {
    /// Fraction of sampled stamp-region pixels that are ink of any color.
    pub ink_density: f64,
    /// Fraction of sampled stamp-region pixels that are blue ink.
    pub blue_density: f64,
    /// Fraction of sampled stamp-region pixels that are black ink.
    pub black_density: f64,
    /// Size in sampled pixels of the largest connected ink component.
    pub largest_component: usize,
    /// Fraction of full-resolution stamp-region pixels that are dark,
    /// non-blue ink.
    pub dark_density: f64,
    /// Fraction of full-resolution stamp-region pixels that are very dark,
    /// non-blue ink.
    pub very_dark_density: f64,
    /// Edge pixels divided by dark pixels; high for thin pen strokes, low
    /// for solid printed areas.
    pub stroke_ratio: f64,
    /// Fraction of sampled date-region pixels that are ink.
    pub date_ink_density: f64,
}

/// Result of verifying one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionVerification {
    pub stamp: FeatureStatus,
    pub signature: FeatureStatus,
    pub date: FeatureStatus,
    pub overall: OverallStatus,
    pub measurements: RegionMeasurements,
}
