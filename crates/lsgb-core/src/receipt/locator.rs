//! Anchor-based identifier locator.
//!
//! Strategies are an explicit ordered list tried via short-circuiting
//! iteration, strict to loose. The cascade runs first against text with
//! digit runs collapsed (OCR injects spaces mid-number), then against the
//! raw text, since collapsing can occasionally destroy a valid separator.

use tracing::debug;

use crate::normalize::{collapse_digit_runs, normalize};

use super::patterns::{
    ANCHOR_LABEL, BROAD_LABEL, DIRECT_ANCHORS, EP1_TOKEN, EXCLUSION_CONTEXTS, H01_TOKEN,
    POSTAL_TAIL,
};
use super::{Confidence, IdentifierMatch, IdentifierType, SourceStrategy};

/// Radius of the exclusion-context window around a candidate match.
const EXCLUSION_RADIUS: usize = 100;

/// How far back a global-fallback 8-digit match looks for a label phrase.
const GLOBAL_LABEL_LOOKBEHIND: usize = 200;

type Strategy = fn(&str) -> Option<IdentifierMatch>;

/// The cascade, in priority order. First success wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct_anchor", direct_anchor),
    ("near_anchor_strict", near_anchor_strict),
    ("near_anchor_broad", near_anchor_broad),
    ("global_fallback", global_fallback),
];

/// Confirmation-of-receipt identifier locator.
#[derive(Debug, Default)]
pub struct IdentifierLocator;

impl IdentifierLocator {
    pub fn new() -> Self {
        Self
    }

    /// Locate the authoritative identifier in one page's text.
    ///
    /// Returns at most one match; the first strategy to produce a valid
    /// token wins and short-circuits the rest.
    pub fn find(&self, text: &str) -> Option<IdentifierMatch> {
        if text.trim().is_empty() {
            return None;
        }

        let collapsed = collapse_digit_runs(text);
        for variant in [collapsed.as_str(), text] {
            for (name, strategy) in STRATEGIES {
                if let Some(found) = strategy(variant) {
                    debug!(strategy = name, value = %found.value, "identifier located");
                    return Some(found);
                }
            }
        }

        None
    }
}

/// Build a match from a raw token, if it normalizes to an accepted shape.
fn validate_token(
    raw: &str,
    strategy: SourceStrategy,
    confidence: Confidence,
) -> Option<IdentifierMatch> {
    let value = normalize(raw);
    let id_type = IdentifierType::from_value(&value);
    if id_type == IdentifierType::Unknown {
        return None;
    }
    Some(IdentifierMatch {
        value,
        id_type,
        raw_token: raw.trim().to_string(),
        strategy,
        confidence,
    })
}

/// Strategy 1: label phrase with the token immediately trailing.
fn direct_anchor(text: &str) -> Option<IdentifierMatch> {
    for pattern in DIRECT_ANCHORS.iter() {
        for caps in pattern.captures_iter(text) {
            let raw = &caps[1];
            if let Some(found) = validate_token(raw, SourceStrategy::DirectAnchor, Confidence::High)
            {
                return Some(found);
            }
            // The greedy token class can swallow a trailing unrelated
            // number; retry on the first whitespace-separated chunk.
            if let Some(chunk) = raw.split_whitespace().next() {
                if let Some(found) =
                    validate_token(chunk, SourceStrategy::DirectAnchor, Confidence::High)
                {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Strategy 2: strict 50-character window after a label phrase.
fn near_anchor_strict(text: &str) -> Option<IdentifierMatch> {
    window_search(text, &ANCHOR_LABEL, 50, false, Confidence::High)
}

/// Strategy 3: broad 100-character window, broader label synonyms, and the
/// postal-code-shape exclusion.
fn near_anchor_broad(text: &str) -> Option<IdentifierMatch> {
    window_search(text, &BROAD_LABEL, 100, true, Confidence::Medium)
}

/// Strategy 4: whole-document scan. 6-digit `5xxxxx` tokens outside postal
/// context are preferred; 8-digit `1xxxxxxx` tokens additionally require a
/// label phrase somewhere in the preceding 200 characters, suppressing
/// false positives on unrelated 8-digit numbers.
fn global_fallback(text: &str) -> Option<IdentifierMatch> {
    for m in H01_TOKEN.find_iter(text) {
        if in_excluded_context(text, m.start(), m.end()) || has_postal_tail(text, m.end()) {
            continue;
        }
        if let Some(found) = validate_token(m.as_str(), SourceStrategy::Global, Confidence::Low) {
            return Some(found);
        }
    }

    for m in EP1_TOKEN.find_iter(text) {
        if in_excluded_context(text, m.start(), m.end()) {
            continue;
        }
        let pre_start = floor_boundary(text, m.start().saturating_sub(GLOBAL_LABEL_LOOKBEHIND));
        if !BROAD_LABEL.is_match(&text[pre_start..m.start()]) {
            continue;
        }
        if let Some(found) = validate_token(m.as_str(), SourceStrategy::Global, Confidence::Low) {
            return Some(found);
        }
    }

    None
}

fn window_search(
    text: &str,
    label: &regex::Regex,
    window: usize,
    postal_check: bool,
    confidence: Confidence,
) -> Option<IdentifierMatch> {
    for label_match in label.find_iter(text) {
        let start = label_match.end();
        let end = ceil_boundary(text, (start + window).min(text.len()));
        let win = &text[start..end];

        // 6-digit H01 tokens first, then 8-digit EP1 tokens.
        for token in [&*H01_TOKEN, &*EP1_TOKEN] {
            for m in token.find_iter(win) {
                let abs_start = start + m.start();
                let abs_end = start + m.end();
                if in_excluded_context(text, abs_start, abs_end) {
                    continue;
                }
                if postal_check && has_postal_tail(text, abs_end) {
                    continue;
                }
                if let Some(found) =
                    validate_token(m.as_str(), SourceStrategy::NearAnchor, confidence)
                {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// True when the ±100-character window around a match reads as address or
/// pagination context.
fn in_excluded_context(text: &str, start: usize, end: usize) -> bool {
    let from = floor_boundary(text, start.saturating_sub(EXCLUSION_RADIUS));
    let to = ceil_boundary(text, (end + EXCLUSION_RADIUS).min(text.len()));
    let window = &text[from..to];
    EXCLUSION_CONTEXTS.iter().any(|p| p.is_match(window))
}

/// True when the match is immediately followed by whitespace then letters,
/// the shape of a postal code preceding a city name.
fn has_postal_tail(text: &str, end: usize) -> bool {
    POSTAL_TAIL.is_match(&text[ceil_boundary(text, end)..])
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(text: &str) -> Option<IdentifierMatch> {
        IdentifierLocator::new().find(text)
    }

    #[test]
    fn test_direct_anchor_english() {
        let found = find("No. of confirmation of receipt 577770").unwrap();
        assert_eq!(found.value, "577770");
        assert_eq!(found.id_type, IdentifierType::H01);
        assert_eq!(found.strategy, SourceStrategy::DirectAnchor);
        assert_eq!(found.confidence, Confidence::High);
    }

    #[test]
    fn test_direct_anchor_german() {
        let found = find("Gelangensbestätigung Nr. 10034567 vom 03.05.2024").unwrap();
        assert_eq!(found.value, "10034567");
        assert_eq!(found.id_type, IdentifierType::Ep1);
    }

    #[test]
    fn test_direct_anchor_with_ocr_noise() {
        let found = find("Confirmation of receipt: S777 7O").unwrap();
        assert_eq!(found.value, "577770");
    }

    #[test]
    fn test_anchor_beats_postal_code() {
        // Address block with a 6-digit postal code right after the anchor.
        let text = "No. of confirmation of receipt 577770\n\
                    Muster Logistik GmbH\n\
                    Hafenweg 12\n\
                    238823 Singapore";
        let found = find(text).unwrap();
        assert_eq!(found.value, "577770");
    }

    #[test]
    fn test_near_anchor_strict_window() {
        let text = "Gelangensbestätigung\nBeleg-Nr 577770 Datum 03.05.2024";
        let found = find(text).unwrap();
        assert_eq!(found.value, "577770");
    }

    #[test]
    fn test_near_anchor_prefers_six_digit_shape() {
        // Both shapes inside the window; the 6-digit token wins even
        // though the 8-digit one comes first.
        let text = "Gelangensbestätigung Auftrag 10034567 Beleg 577770";
        let found = find(text).unwrap();
        assert_eq!(found.value, "577770");
    }

    #[test]
    fn test_broad_window_synonym() {
        let text = "Empfangsbestätigung des Kunden, siehe Referenz im Anhang: 10034567";
        let found = find(text).unwrap();
        assert_eq!(found.value, "10034567");
        assert_eq!(found.strategy, SourceStrategy::NearAnchor);
    }

    #[test]
    fn test_global_fallback_six_digit() {
        let text = "Warenausgang Beleg 577770\nLager Nord";
        let found = find(text).unwrap();
        assert_eq!(found.value, "577770");
        assert_eq!(found.strategy, SourceStrategy::Global);
        assert_eq!(found.confidence, Confidence::Low);
    }

    #[test]
    fn test_global_eight_digit_requires_label() {
        // An unrelated 8-digit material number with no label phrase
        // anywhere must not match.
        assert!(find("Materialnummer 10034567").is_none());
    }

    #[test]
    fn test_global_postal_tail_skipped() {
        // 5xxxxx followed by a city name reads as a postal code.
        assert!(find("Kundenlager 538223 Hamburg West").is_none());
    }

    #[test]
    fn test_address_context_excluded() {
        let text = "Muster GmbH, Lagerstr. 5, D-80331 München, Beleg 577770";
        // The whole line sits in an address context window.
        assert!(find(text).is_none());
    }

    #[test]
    fn test_collapsed_digits_recovered() {
        let found = find("Gelangensbestätigung Nr. 57 77 70").unwrap();
        assert_eq!(found.value, "577770");
    }

    #[test]
    fn test_empty_text() {
        assert!(find("").is_none());
        assert!(find("   \n  ").is_none());
    }
}
