//! Configuration structures for the extraction pipeline.
//!
//! Every heuristic threshold is configurable here rather than a literal in
//! the code; the region thresholds in particular are tuned empirically per
//! document source.

use serde::{Deserialize, Serialize};

/// Main configuration for the lsgb pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LsgbConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,

    /// Delivery-note classification configuration.
    pub delivery: DeliveryConfig,

    /// Confirmation-of-receipt grouping configuration.
    pub grouping: GroupingConfig,

    /// Stamp/signature/date region analysis configuration.
    pub region: RegionConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try to extract embedded text before falling back to OCR.
    pub prefer_embedded_text: bool,

    /// Minimum per-page text length below which the page is considered
    /// sparse and handed to the OCR fallback.
    pub min_text_length: usize,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            prefer_embedded_text: true,
            min_text_length: 50,
            max_pages: 0,
        }
    }
}

/// OCR fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Enable the OCR fallback for sparse pages.
    pub enabled: bool,

    /// Per-page OCR timeout in milliseconds. On timeout the page is
    /// treated as having empty text, not as an error.
    pub timeout_ms: u64,

    /// Directory containing the detection/recognition model files.
    pub model_dir: std::path::PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            model_dir: std::path::PathBuf::from("models"),
        }
    }
}

/// Delivery-note candidate classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Minimum normalized token length to keep as a candidate.
    pub min_candidate_len: usize,

    /// Maximum normalized token length to keep as a candidate.
    pub max_candidate_len: usize,

    /// Dominant-digit threshold: the most frequent leading digit must
    /// account for at least this fraction of accepted values before
    /// 7-digit candidates are repaired with it.
    pub dominant_digit_min_share: f64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            min_candidate_len: 7,
            max_candidate_len: 12,
            dominant_digit_min_share: 0.3,
        }
    }
}

/// Page grouping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// How many pages ahead a leading orphan page may look for an
    /// identifier-bearing page to attach to.
    pub orphan_lookahead: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self { orphan_lookahead: 2 }
    }
}

/// Fractional region of interest on a page raster.
///
/// All values are fractions of the full page width/height in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Region analysis thresholds. Defaults are tuned for 150 dpi scans of
/// stamped delivery confirmations; override per document source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Stamp/signature region (bottom-right quadrant by default).
    pub stamp_region: RegionOfInterest,

    /// Handwritten-date region, non-overlapping with the stamp region.
    pub date_region: RegionOfInterest,

    /// Pixel sampling stride for the density/component pass.
    pub sample_stride: u32,

    /// Euclidean RGB distance from pure white above which a sampled pixel
    /// counts as ink.
    pub white_distance_threshold: f32,

    /// Blue channel must exceed both other channels by this margin to
    /// count as blue ink.
    pub blue_margin: u8,

    /// Absolute minimum blue channel value for blue ink.
    pub blue_min: u8,

    /// All channels below this value count as black ink.
    pub black_max: u8,

    /// Blue-ink density at or above which a stamp is present. Densities in
    /// `[0.5 × threshold, threshold)` are classified uncertain.
    pub stamp_blue_density: f64,

    /// Luminance below which a full-resolution pixel counts as dark ink.
    pub dark_luma: u8,

    /// Luminance below which a pixel counts as very dark ink (blueish
    /// pixels excluded, to separate black pen from dark stamp ink).
    pub very_dark_luma: u8,

    /// Local luminance gradient above which a pixel counts as an edge.
    pub edge_gradient: u8,

    /// Dark-ink density threshold for the medium-confidence signature rule.
    pub signature_dark_density: f64,

    /// Very-dark-ink density at or above which a signature is present with
    /// high confidence.
    pub signature_very_dark_density: f64,

    /// Minimum stroke ratio (edge pixels / dark pixels) for the
    /// medium-confidence signature rule.
    pub signature_stroke_ratio: f64,

    /// Ink density at or above which the date field counts as filled.
    /// Densities in `[0.5 × threshold, threshold)` are uncertain.
    pub date_ink_density: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            stamp_region: RegionOfInterest {
                x: 0.5,
                y: 0.6,
                width: 0.5,
                height: 0.4,
            },
            date_region: RegionOfInterest {
                x: 0.0,
                y: 0.6,
                width: 0.5,
                height: 0.4,
            },
            sample_stride: 3,
            white_distance_threshold: 60.0,
            blue_margin: 20,
            blue_min: 80,
            black_max: 80,
            stamp_blue_density: 0.01,
            dark_luma: 110,
            very_dark_luma: 60,
            edge_gradient: 40,
            signature_dark_density: 0.008,
            signature_very_dark_density: 0.003,
            signature_stroke_ratio: 0.35,
            date_ink_density: 0.004,
        }
    }
}

impl LsgbConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = LsgbConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: LsgbConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.grouping.orphan_lookahead, 2);
        assert_eq!(back.delivery.min_candidate_len, 7);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LsgbConfig =
            serde_json::from_str(r#"{"grouping": {"orphan_lookahead": 4}}"#).unwrap();
        assert_eq!(config.grouping.orphan_lookahead, 4);
        assert_eq!(config.pdf.min_text_length, 50);
    }
}
