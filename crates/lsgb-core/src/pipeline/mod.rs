//! End-to-end document processing.
//!
//! The pipeline wires the collaborators together: PDF access, the OCR
//! fallback for sparse pages, then either the delivery-note classifier or
//! the confirmation-of-receipt locate/group/verify flow.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::delivery::{ClassificationResult, TextItem, classify, extract_candidates};
use crate::error::{LsgbError, OcrError, Result};
use crate::models::config::LsgbConfig;
use crate::models::manifest::{DocumentStatus, ManifestRow};
use crate::ocr::{OcrEngine, ocr_with_timeout};
use crate::pdf::{PdfExtractor, PdfProcessor};
use crate::receipt::grouper::{PageGroup, PageRecord, group_pages};
use crate::receipt::locator::IdentifierLocator;
use crate::region::{RegionAnalyzer, RegionVerification};

/// Which extraction flow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Extract and classify delivery-note numbers.
    DeliveryNotes,
    /// Locate confirmation-of-receipt identifiers, group pages, verify
    /// stamp/signature/date regions.
    ConfirmationOfReceipt,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::DeliveryNotes => "delivery_notes",
            PipelineMode::ConfirmationOfReceipt => "confirmation_of_receipt",
        }
    }
}

/// Result for one identifier group in confirmation-of-receipt mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub identifier: Option<String>,
    pub id_type: String,
    /// 1-based inclusive page range.
    pub pages: String,
    pub status: DocumentStatus,
    /// Region analysis result, absent for digitally signed documents and
    /// pages without a raster.
    pub verification: Option<RegionVerification>,
    pub notes: String,
}

/// Full processing result for one input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub input: String,
    /// When processing finished.
    pub processed_at: chrono::DateTime<chrono::Utc>,
    pub total_pages: u32,
    pub mode: PipelineMode,
    pub digitally_signed: bool,
    /// Classification result, delivery-notes mode only.
    pub delivery: Option<ClassificationResult>,
    /// Identifier groups, confirmation-of-receipt mode only.
    pub groups: Vec<GroupReport>,
    /// Zero-based indices of pages that could not be attached to a group.
    pub dropped_pages: Vec<usize>,
    /// Page indices where the OCR fallback supplied the text.
    pub ocr_pages: Vec<usize>,
}

impl DocumentReport {
    /// Flatten the report into manifest rows, at least one per document.
    pub fn manifest_rows(&self) -> Vec<ManifestRow> {
        match self.mode {
            PipelineMode::DeliveryNotes => self.delivery_rows(),
            PipelineMode::ConfirmationOfReceipt => self.group_rows(),
        }
    }

    fn delivery_rows(&self) -> Vec<ManifestRow> {
        let Some(result) = self.delivery.as_ref() else {
            return vec![ManifestRow::error(&self.input, "no classification result")];
        };

        if result.accepted.is_empty() {
            return vec![ManifestRow {
                input: self.input.clone(),
                total_pages: self.total_pages,
                output_file: None,
                identifier: None,
                id_type: "UNKNOWN".to_string(),
                status: DocumentStatus::NoIdentifier,
                stamp_status: None,
                signature_status: None,
                pages: full_range(self.total_pages),
                notes: format!(
                    "{} excluded, {} invalid",
                    result.excluded.len(),
                    result.invalid.len()
                ),
            }];
        }

        result
            .accepted
            .iter()
            .map(|value| ManifestRow {
                input: self.input.clone(),
                total_pages: self.total_pages,
                output_file: None,
                identifier: Some(value.clone()),
                id_type: "DN".to_string(),
                status: DocumentStatus::Ok,
                stamp_status: None,
                signature_status: None,
                pages: full_range(self.total_pages),
                notes: String::new(),
            })
            .collect()
    }

    fn group_rows(&self) -> Vec<ManifestRow> {
        if self.groups.is_empty() {
            return vec![ManifestRow {
                input: self.input.clone(),
                total_pages: self.total_pages,
                output_file: None,
                identifier: None,
                id_type: "UNKNOWN".to_string(),
                status: DocumentStatus::NoIdentifier,
                stamp_status: None,
                signature_status: None,
                pages: full_range(self.total_pages),
                notes: "no identifier found on any page".to_string(),
            }];
        }

        self.groups
            .iter()
            .map(|group| ManifestRow {
                input: self.input.clone(),
                total_pages: self.total_pages,
                output_file: None,
                identifier: group.identifier.clone(),
                id_type: group.id_type.clone(),
                status: group.status,
                stamp_status: group
                    .verification
                    .as_ref()
                    .map(|v| v.stamp.as_str().to_string()),
                signature_status: group
                    .verification
                    .as_ref()
                    .map(|v| v.signature.as_str().to_string()),
                pages: group.pages.clone(),
                notes: group.notes.clone(),
            })
            .collect()
    }
}

/// Per-page text after extraction and the optional OCR fallback.
struct PageText {
    index: usize,
    num: u32,
    text: String,
    used_ocr: bool,
}

/// The document pipeline. One instance handles many documents; it holds
/// configuration, the identifier locator and an optional OCR engine.
pub struct DocumentPipeline {
    config: LsgbConfig,
    locator: IdentifierLocator,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl DocumentPipeline {
    pub fn new(config: LsgbConfig) -> Self {
        Self {
            config,
            locator: IdentifierLocator::new(),
            ocr: None,
        }
    }

    /// Attach an OCR engine for the sparse-page fallback.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn config(&self) -> &LsgbConfig {
        &self.config
    }

    /// Process a PDF file from disk.
    pub fn process_file(&self, path: &Path, mode: PipelineMode) -> Result<DocumentReport> {
        let input = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extractor = PdfExtractor::from_file(path)?;
        self.process_document(&input, &extractor, mode)
    }

    /// Process an already loaded document.
    pub fn process_document(
        &self,
        input: &str,
        pdf: &dyn PdfProcessor,
        mode: PipelineMode,
    ) -> Result<DocumentReport> {
        let total_pages = pdf.page_count();
        if total_pages == 0 {
            return Err(LsgbError::Pdf(crate::error::PdfError::NoPages));
        }

        info!(input, total_pages, mode = mode.as_str(), "processing document");

        let pages = self.collect_pages(pdf)?;
        let ocr_pages: Vec<usize> = pages.iter().filter(|p| p.used_ocr).map(|p| p.index).collect();

        let mut report = DocumentReport {
            input: input.to_string(),
            processed_at: chrono::Utc::now(),
            total_pages,
            mode,
            digitally_signed: pdf.has_digital_signature(),
            delivery: None,
            groups: Vec::new(),
            dropped_pages: Vec::new(),
            ocr_pages,
        };

        match mode {
            PipelineMode::DeliveryNotes => {
                report.delivery = Some(self.run_delivery(&pages));
            }
            PipelineMode::ConfirmationOfReceipt => {
                self.run_confirmation(pdf, &pages, &mut report);
            }
        }

        Ok(report)
    }

    /// Per-page text extraction with the OCR fallback for sparse pages.
    fn collect_pages(&self, pdf: &dyn PdfProcessor) -> Result<Vec<PageText>> {
        let mut page_count = pdf.page_count();
        if self.config.pdf.max_pages > 0 {
            page_count = page_count.min(self.config.pdf.max_pages as u32);
        }

        let mut pages = Vec::with_capacity(page_count as usize);
        for num in 1..=page_count {
            let embedded = if self.config.pdf.prefer_embedded_text {
                pdf.extract_page_text(num).unwrap_or_default()
            } else {
                String::new()
            };

            let mut text = embedded;
            let mut used_ocr = false;

            if text.trim().len() < self.config.pdf.min_text_length {
                if let Some(ocr_text) = self.ocr_page(pdf, num) {
                    text = ocr_text;
                    used_ocr = true;
                }
            }

            pages.push(PageText {
                index: (num - 1) as usize,
                num,
                text,
                used_ocr,
            });
        }

        Ok(pages)
    }

    fn ocr_page(&self, pdf: &dyn PdfProcessor, num: u32) -> Option<String> {
        if !self.config.ocr.enabled {
            return None;
        }
        let engine = self.ocr.as_ref()?;

        let raster = match pdf.page_raster(num) {
            Ok(r) => r,
            Err(e) => {
                debug!(page = num, error = %e, "no raster for OCR fallback");
                return None;
            }
        };

        match ocr_with_timeout(Arc::clone(engine), &raster, self.config.ocr.timeout_ms) {
            Ok(text) => Some(text),
            Err(OcrError::Timeout(ms)) => {
                warn!(page = num, timeout_ms = ms, "OCR timed out, treating page as empty");
                None
            }
            Err(e) => {
                warn!(page = num, error = %e, "OCR failed, keeping embedded text");
                None
            }
        }
    }

    fn run_delivery(&self, pages: &[PageText]) -> ClassificationResult {
        let items: Vec<TextItem> = pages
            .iter()
            .map(|p| TextItem {
                text: p.text.clone(),
                page_index: p.index,
            })
            .collect();

        let candidates = extract_candidates(&items, &self.config.delivery);
        debug!(candidates = candidates.len(), "extracted delivery-note candidates");
        classify(&candidates, &self.config.delivery)
    }

    fn run_confirmation(
        &self,
        pdf: &dyn PdfProcessor,
        pages: &[PageText],
        report: &mut DocumentReport,
    ) {
        let records: Vec<PageRecord> = pages
            .iter()
            .map(|p| PageRecord {
                page_index: p.index,
                page_num: p.num,
                extracted_text: p.text.clone(),
                used_ocr: p.used_ocr,
                identifier: self.locator.find(&p.text),
            })
            .collect();

        let outcome = group_pages(&records, &self.config.grouping);
        report.dropped_pages = outcome.dropped_pages;

        let analyzer = RegionAnalyzer::new(self.config.region.clone());
        for group in &outcome.groups {
            report
                .groups
                .push(self.verify_group(pdf, group, &analyzer, report.digitally_signed));
        }
    }

    fn verify_group(
        &self,
        pdf: &dyn PdfProcessor,
        group: &PageGroup,
        analyzer: &RegionAnalyzer,
        signed: bool,
    ) -> GroupReport {
        let identifier = group.identifier_value.clone();
        let id_type = group.id_type.as_str().to_string();
        let pages = group.page_range();

        if signed {
            return GroupReport {
                identifier,
                id_type,
                pages,
                status: DocumentStatus::Signed,
                verification: None,
                notes: "digitally signed, region analysis skipped".to_string(),
            };
        }

        // Stamp and signature live on the last page of the group.
        let raster = group
            .representative_page()
            .and_then(|page| match pdf.page_raster(page.page_num) {
                Ok(r) => Some(r),
                Err(e) => {
                    debug!(page = page.page_num, error = %e, "no raster for region analysis");
                    None
                }
            });

        match raster {
            Some(img) => {
                let verification = analyzer.analyze(&img.to_rgb8());
                let notes = verification.overall.as_str().to_string();
                GroupReport {
                    identifier,
                    id_type,
                    pages,
                    status: DocumentStatus::Ok,
                    verification: Some(verification),
                    notes,
                }
            }
            None => GroupReport {
                identifier,
                id_type,
                pages,
                status: DocumentStatus::Ok,
                verification: None,
                notes: "no page raster, region analysis skipped".to_string(),
            },
        }
    }
}

fn full_range(total_pages: u32) -> String {
    if total_pages > 1 {
        format!("1-{}", total_pages)
    } else {
        "1".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::models::manifest::DocumentStatus;
    use crate::region::OverallStatus;
    use image::{DynamicImage, Rgb, RgbImage};

    /// In-memory PDF double with fixed page texts and rasters.
    struct FakePdf {
        pages: Vec<String>,
        rasters: Vec<Option<DynamicImage>>,
        signed: bool,
    }

    impl FakePdf {
        fn with_texts(texts: &[&str]) -> Self {
            Self {
                pages: texts.iter().map(|t| t.to_string()).collect(),
                rasters: texts.iter().map(|_| None).collect(),
                signed: false,
            }
        }

        fn set_raster(&mut self, page_index: usize, img: RgbImage) {
            self.rasters[page_index] = Some(DynamicImage::ImageRgb8(img));
        }
    }

    impl PdfProcessor for FakePdf {
        fn load(&mut self, _data: &[u8]) -> crate::pdf::Result<()> {
            Ok(())
        }

        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn extract_text(&self) -> crate::pdf::Result<String> {
            Ok(self.pages.join("\n\n"))
        }

        fn extract_page_text(&self, page: u32) -> crate::pdf::Result<String> {
            self.pages
                .get((page - 1) as usize)
                .cloned()
                .ok_or(PdfError::InvalidPage(page))
        }

        fn page_raster(&self, page: u32) -> crate::pdf::Result<DynamicImage> {
            self.rasters
                .get((page - 1) as usize)
                .and_then(|r| r.clone())
                .ok_or_else(|| PdfError::RasterExtraction("no raster".to_string()))
        }

        fn extract_images(&self, _page: u32) -> crate::pdf::Result<Vec<DynamicImage>> {
            Ok(Vec::new())
        }

        fn has_digital_signature(&self) -> bool {
            self.signed
        }
    }

    fn pipeline() -> DocumentPipeline {
        DocumentPipeline::new(LsgbConfig::default())
    }

    fn complete_page_raster() -> RgbImage {
        let mut img = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
        // Blue stamp, dark signature stroke, dark date stroke.
        for y in 220..270 {
            for x in 200..260 {
                img.put_pixel(x, y, Rgb([30, 60, 200]));
            }
        }
        for x in 160..260 {
            img.put_pixel(x, 280, Rgb([20, 20, 20]));
            img.put_pixel(x, 281, Rgb([20, 20, 20]));
        }
        for x in 20..80 {
            img.put_pixel(x, 240, Rgb([20, 20, 20]));
            img.put_pixel(x, 241, Rgb([20, 20, 20]));
        }
        img
    }

    #[test]
    fn test_delivery_mode() {
        // Text-rich pages, no OCR involved.
        let pdf = FakePdf::with_texts(&[
            "Lieferschein 26996798 Position 1 Menge 10 Stück Artikel 4711",
            "Lieferschein 2699679B Position 2 Menge 20 Stück Artikel 4712",
        ]);
        let report = pipeline()
            .process_document("notes.pdf", &pdf, PipelineMode::DeliveryNotes)
            .unwrap();

        let delivery = report.delivery.as_ref().unwrap();
        assert_eq!(delivery.accepted, vec!["26996798".to_string()]);
        assert_eq!(delivery.duplicates.len(), 1);

        let rows = report.manifest_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identifier.as_deref(), Some("26996798"));
        assert_eq!(rows[0].status, DocumentStatus::Ok);
    }

    #[test]
    fn test_confirmation_mode_groups_and_verifies() {
        let long_filler = "Lieferbedingungen und allgemeine Hinweise zum Warenempfang folgen";
        let mut pdf = FakePdf::with_texts(&[
            &format!("No. of confirmation of receipt 577770\n{}", long_filler),
            &format!("Anlage zur Sendung\n{}", long_filler),
        ]);
        pdf.set_raster(1, complete_page_raster());

        let report = pipeline()
            .process_document("receipt.pdf", &pdf, PipelineMode::ConfirmationOfReceipt)
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        let group = &report.groups[0];
        assert_eq!(group.identifier.as_deref(), Some("577770"));
        assert_eq!(group.id_type, "H01");
        assert_eq!(group.pages, "1-2");
        let verification = group.verification.as_ref().unwrap();
        assert_eq!(verification.overall, OverallStatus::Complete);

        let rows = report.manifest_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stamp_status.as_deref(), Some("present"));
        assert_eq!(rows[0].signature_status.as_deref(), Some("present"));
    }

    #[test]
    fn test_confirmation_mode_no_identifier() {
        let filler = "Allgemeine Geschäftsbedingungen für Lieferungen und Leistungen im Überblick";
        let pdf = FakePdf::with_texts(&[filler]);
        let report = pipeline()
            .process_document("blank.pdf", &pdf, PipelineMode::ConfirmationOfReceipt)
            .unwrap();

        assert!(report.groups.is_empty());
        let rows = report.manifest_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DocumentStatus::NoIdentifier);
    }

    #[test]
    fn test_signed_document_skips_region_analysis() {
        let filler = "Lieferbedingungen und allgemeine Hinweise zum Warenempfang folgen";
        let mut pdf = FakePdf::with_texts(&[&format!(
            "No. of confirmation of receipt 577770\n{}",
            filler
        )]);
        pdf.signed = true;

        let report = pipeline()
            .process_document("signed.pdf", &pdf, PipelineMode::ConfirmationOfReceipt)
            .unwrap();

        assert!(report.digitally_signed);
        let rows = report.manifest_rows();
        assert_eq!(rows[0].status, DocumentStatus::Signed);
        assert!(rows[0].stamp_status.is_none());
    }

    #[test]
    fn test_missing_raster_still_reports_group() {
        let filler = "Lieferbedingungen und allgemeine Hinweise zum Warenempfang folgen";
        let pdf = FakePdf::with_texts(&[&format!(
            "No. of confirmation of receipt 577770\n{}",
            filler
        )]);
        let report = pipeline()
            .process_document("no_raster.pdf", &pdf, PipelineMode::ConfirmationOfReceipt)
            .unwrap();

        let rows = report.manifest_rows();
        assert_eq!(rows[0].status, DocumentStatus::Ok);
        assert!(rows[0].notes.contains("region analysis skipped"));
        assert!(rows[0].stamp_status.is_none());
    }

    #[test]
    fn test_empty_document_is_error() {
        let pdf = FakePdf::with_texts(&[]);
        let result = pipeline().process_document("empty.pdf", &pdf, PipelineMode::DeliveryNotes);
        assert!(result.is_err());
    }

    #[test]
    fn test_ocr_fallback_feeds_locator() {
        struct StubOcr;
        impl crate::ocr::OcrEngine for StubOcr {
            fn extract_text(
                &self,
                _image: &DynamicImage,
            ) -> std::result::Result<String, crate::error::OcrError> {
                Ok("Gelangensbestätigung Nr. 577770".to_string())
            }
        }

        // Sparse embedded text forces the OCR fallback.
        let mut pdf = FakePdf::with_texts(&["scan"]);
        pdf.set_raster(0, complete_page_raster());

        let pipeline = DocumentPipeline::new(LsgbConfig::default())
            .with_ocr_engine(Arc::new(StubOcr));
        let report = pipeline
            .process_document("scan.pdf", &pdf, PipelineMode::ConfirmationOfReceipt)
            .unwrap();

        assert_eq!(report.ocr_pages, vec![0]);
        assert_eq!(report.groups[0].identifier.as_deref(), Some("577770"));
    }
}
