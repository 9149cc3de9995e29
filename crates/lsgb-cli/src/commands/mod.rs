//! CLI command implementations.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use lsgb_core::models::config::LsgbConfig;
use lsgb_core::pipeline::{DocumentPipeline, PipelineMode};

/// Extraction mode selector shared by process and batch.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Mode {
    /// Extract and classify delivery-note numbers
    Delivery,
    /// Locate confirmation-of-receipt identifiers and verify regions
    Receipt,
}

impl From<Mode> for PipelineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Delivery => PipelineMode::DeliveryNotes,
            Mode::Receipt => PipelineMode::ConfirmationOfReceipt,
        }
    }
}

/// Load configuration from an explicit path or fall back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LsgbConfig> {
    match config_path {
        Some(path) => Ok(LsgbConfig::from_file(Path::new(path))?),
        None => Ok(LsgbConfig::default()),
    }
}

/// Build the pipeline, attaching the OCR engine when models are available.
pub fn build_pipeline(
    config: LsgbConfig,
    model_dir: Option<&PathBuf>,
    text_only: bool,
) -> DocumentPipeline {
    let model_dir = model_dir.cloned().unwrap_or_else(|| config.ocr.model_dir.clone());
    let pipeline = DocumentPipeline::new(config);

    if text_only {
        return pipeline;
    }

    match lsgb_core::PureOcrEngine::from_dir(&model_dir) {
        Ok(engine) => {
            debug!("loaded OCR models from {}", model_dir.display());
            pipeline.with_ocr_engine(Arc::new(engine))
        }
        Err(e) => {
            warn!(
                "OCR models not available at {} ({}), sparse pages will have no text",
                model_dir.display(),
                e
            );
            pipeline
        }
    }
}
