//! OCR backend using `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::OcrError;

use super::OcrEngine;

/// A recognized text region, reduced to what the identifier search needs.
struct TextRegion {
    text: String,
    min_x: f32,
    min_y: f32,
}

/// PaddleOCR-style detection + recognition via `pure-onnx-ocr`.
pub struct PureOcrEngine {
    // The upstream engine uses `RefCell` internally and is not `Sync`;
    // the mutex makes it satisfy the `OcrEngine: Send + Sync` bound.
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
}

// SAFETY: the upstream engine is `!Send + !Sync` only because of `RefCell`
// plan caches that never leave it (no public accessor exposes them and the
// crate spawns no threads). Every access goes through the `Mutex` above, so
// the caches can never be borrowed from two threads at once.
unsafe impl Send for PureOcrEngine {}
unsafe impl Sync for PureOcrEngine {}

impl PureOcrEngine {
    /// Load model files from a directory. Expects `det.onnx`,
    /// `latin_rec.onnx` and `latin_dict.txt`.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("loaded pure-onnx-ocr engine from {}", model_dir.display());
        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl OcrEngine for PureOcrEngine {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();

        let results = self
            .engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut regions: Vec<TextRegion> = results
            .iter()
            .map(|r| {
                let (min_x, min_y) = polygon_origin(&r.bounding_box);
                TextRegion {
                    text: r.text.replace("[UNK]", " "),
                    min_x,
                    min_y,
                }
            })
            .collect();

        sort_reading_order(&mut regions);

        let text = regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            regions = regions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "OCR pass finished"
        );

        Ok(text)
    }
}

/// Top-to-bottom, then left-to-right, with a 20-pixel row tolerance so
/// boxes on one printed line stay together.
fn sort_reading_order(regions: &mut [TextRegion]) {
    regions.sort_by(|a, b| {
        let row_a = (a.min_y / 20.0) as i32;
        let row_b = (b.min_y / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.min_x
                .partial_cmp(&b.min_x)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Top-left corner of a detection polygon.
fn polygon_origin(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    for coord in polygon.exterior().coords() {
        min_x = min_x.min(coord.x as f32);
        min_y = min_y.min(coord.y as f32);
    }
    if min_x.is_infinite() {
        (0.0, 0.0)
    } else {
        (min_x, min_y)
    }
}
