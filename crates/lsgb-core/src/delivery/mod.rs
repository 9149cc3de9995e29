//! Delivery-note candidate extraction and classification.
//!
//! The delivery pipeline pulls numeric-looking tokens out of a document's
//! text items, normalizes them ([`crate::normalize`]), and classifies each
//! unique value by digit count: 8 digits are accepted, 9/10 digits are
//! excluded as likely Transport IDs, leading-zero-corrupted and truncated
//! 7-digit values are repaired by the auto-correction rules.

pub mod autocorrect;
pub mod classifier;

pub use classifier::classify;

use serde::{Deserialize, Serialize};

use crate::models::config::DeliveryConfig;
use crate::normalize::normalize;

/// Shared confidence level for corrections and identifier matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A raw text item supplied by the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextItem {
    /// Raw extracted text.
    pub text: String,
    /// Zero-based page index the text came from.
    pub page_index: usize,
}

/// A numeric-looking token extracted from document text, pre-classification.
///
/// Multiple candidates with identical value are distinct occurrences;
/// `occurrence_index` numbers them in extraction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Normalized digit string.
    pub value: String,
    /// Zero-based page index the token came from.
    pub source_page: usize,
    /// Zero-based occurrence index of this value within the document.
    pub occurrence_index: usize,
}

/// A value excluded from acceptance (likely a different identifier kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedValue {
    pub value: String,
    pub reason: String,
}

/// A value that could not be recovered into a canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidValue {
    pub value: String,
    pub reason: String,
}

/// Log entry for one applied auto-correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCorrection {
    pub original: String,
    pub corrected: String,
    pub reason: String,
    pub confidence: Confidence,
}

/// A value occurring more than once, or an auto-correction colliding with
/// an already-accepted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateValue {
    pub value: String,
    pub count: usize,
    pub reason: String,
}

/// Per-document classification result.
///
/// A value lands in exactly one of `accepted` / `excluded` / `invalid` as
/// its terminal classification. `auto_corrections` is a log, not a bucket:
/// corrected values also appear in `accepted` (or in `duplicates` when the
/// corrected value was already accepted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Canonical 8-digit values.
    pub accepted: Vec<String>,
    /// 9/10-digit values, likely non-delivery-note identifiers.
    pub excluded: Vec<ExcludedValue>,
    /// Unrecoverable values.
    pub invalid: Vec<InvalidValue>,
    /// Applied corrections, in application order.
    pub auto_corrections: Vec<AutoCorrection>,
    /// Repeated values and correction collisions.
    pub duplicates: Vec<DuplicateValue>,
}

/// Extract candidates from a document's text items.
///
/// Each item is whitespace-tokenized; tokens whose normalized form falls
/// inside the configured length window become candidates. Shorter digit
/// runs are noise (dates, quantities), longer ones are account or article
/// numbers this pipeline does not classify.
pub fn extract_candidates(items: &[TextItem], config: &DeliveryConfig) -> Vec<Candidate> {
    let mut occurrences: std::collections::HashMap<String, usize> =
        std::collections::HashMap::new();
    let mut candidates = Vec::new();

    for item in items {
        for token in item.text.split_whitespace() {
            let value = normalize(token);
            if value.len() < config.min_candidate_len || value.len() > config.max_candidate_len {
                continue;
            }
            let index = occurrences.entry(value.clone()).or_insert(0);
            candidates.push(Candidate {
                value,
                source_page: item.page_index,
                occurrence_index: *index,
            });
            *index += 1;
        }
    }

    candidates
}
