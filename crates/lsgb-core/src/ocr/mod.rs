//! OCR fallback for pages without usable embedded text.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use image::DynamicImage;
use tracing::warn;

use crate::error::OcrError;

/// Text extraction from a page raster.
///
/// The pipeline holds the engine behind this trait so the native
/// pure-onnx-ocr backend can be swapped for a stub in tests.
pub trait OcrEngine: Send + Sync {
    /// Run OCR on a page raster and return the recognized text in reading
    /// order.
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Run OCR with a hard wall-clock timeout.
///
/// The recognition runs on a spawned thread; if it does not answer within
/// the timeout the thread is abandoned and [`OcrError::Timeout`] returned.
/// The caller decides whether a timeout is fatal (the pipeline treats it
/// as an empty page).
pub fn ocr_with_timeout(
    engine: Arc<dyn OcrEngine>,
    image: &DynamicImage,
    timeout_ms: u64,
) -> Result<String, OcrError> {
    let (tx, rx) = mpsc::channel();
    let image = image.clone();

    std::thread::spawn(move || {
        let result = engine.extract_text(&image);
        // The receiver may be gone after a timeout.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(Duration::from_millis(timeout_ms)) {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms, "OCR did not finish within timeout");
            Err(OcrError::Timeout(timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct SlowEngine;

    impl OcrEngine for SlowEngine {
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(String::new())
        }
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_fast_engine_completes() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedEngine("Gelangensbestätigung 577770"));
        let text = ocr_with_timeout(engine, &blank(), 5_000).unwrap();
        assert_eq!(text, "Gelangensbestätigung 577770");
    }

    #[test]
    fn test_slow_engine_times_out() {
        let engine: Arc<dyn OcrEngine> = Arc::new(SlowEngine);
        let result = ocr_with_timeout(engine, &blank(), 20);
        assert!(matches!(result, Err(OcrError::Timeout(20))));
    }
}
