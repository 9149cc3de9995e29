//! Digit-count classification of delivery-note candidates.
//!
//! Rules, in priority order per candidate value:
//! 1. non-digit content → invalid
//! 2. 8 digits → accepted unconditionally
//! 3. 9/10 digits with leading zeros → leading-zero correction attempt,
//!    else excluded as a likely Transport ID
//! 4. 11+ digits with leading zeros → same attempt, same outcomes
//! 5. 9/10 digits without leading zeros → excluded
//! 6. 7 digits → deferred to the dominant-digit pass
//! 7. anything else → invalid
//!
//! Classification runs over the unique value set; occurrence counts only
//! feed the duplicates report.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::models::config::DeliveryConfig;

use super::autocorrect::{dominant_digit, strip_leading_zeros};
use super::{
    AutoCorrection, Candidate, ClassificationResult, Confidence, DuplicateValue, ExcludedValue,
    InvalidValue,
};

/// Classify a document's candidates into the result buckets.
///
/// Strictly sequential within a document: the dominant-digit pass needs
/// every other candidate classified first.
pub fn classify(candidates: &[Candidate], config: &DeliveryConfig) -> ClassificationResult {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&str> = Vec::new();
    for candidate in candidates {
        let count = occurrences.entry(candidate.value.as_str()).or_insert(0);
        if *count == 0 {
            unique.push(candidate.value.as_str());
        }
        *count += 1;
    }

    let mut result = ClassificationResult::default();
    let mut accepted_set: HashSet<String> = HashSet::new();
    let mut pending_sevens: Vec<&str> = Vec::new();

    // Repeated source values, reported regardless of terminal bucket.
    for value in &unique {
        let count = occurrences[value];
        if count > 1 {
            result.duplicates.push(DuplicateValue {
                value: value.to_string(),
                count,
                reason: format!("Appears {} times in document", count),
            });
        }
    }

    // Pass 1: rules 1-5 and 7; rule 6 defers 7-digit values.
    for &value in &unique {
        classify_value(value, &mut result, &mut accepted_set, &mut pending_sevens, &occurrences);
    }

    // Pass 2: dominant-digit resolution of deferred 7-digit values. The
    // histogram covers rule-2 acceptances and leading-zero corrections,
    // both of which are in `accepted` at this point.
    if !pending_sevens.is_empty() {
        let dominant = dominant_digit(&result.accepted, config.dominant_digit_min_share);
        debug!(?dominant, pending = pending_sevens.len(), "resolving 7-digit candidates");
        for value in pending_sevens {
            resolve_seven(value, dominant, &mut result, &mut accepted_set, &occurrences);
        }
    }

    info!(
        accepted = result.accepted.len(),
        excluded = result.excluded.len(),
        invalid = result.invalid.len(),
        corrections = result.auto_corrections.len(),
        duplicates = result.duplicates.len(),
        "classification complete"
    );

    result
}

fn classify_value<'a>(
    value: &'a str,
    result: &mut ClassificationResult,
    accepted_set: &mut HashSet<String>,
    pending_sevens: &mut Vec<&'a str>,
    occurrences: &HashMap<&'a str, usize>,
) {
    if !value.chars().all(|c| c.is_ascii_digit()) || value.is_empty() {
        result.invalid.push(InvalidValue {
            value: value.to_string(),
            reason: "Contains non-digit characters".to_string(),
        });
        return;
    }

    let len = value.len();
    match len {
        8 => {
            // Accepted as-is, internal leading zeros included.
            result.accepted.push(value.to_string());
            accepted_set.insert(value.to_string());
        }
        9.. if value.starts_with('0') => {
            if let Some((corrected, removed)) = strip_leading_zeros(value) {
                apply_correction(
                    value,
                    &corrected,
                    format!("Removed {} leading zero(s)", removed),
                    result,
                    accepted_set,
                    occurrences,
                );
            } else {
                result.excluded.push(ExcludedValue {
                    value: value.to_string(),
                    reason: format!("{} digits (excluded - likely Transport ID)", len),
                });
            }
        }
        9 | 10 => {
            result.excluded.push(ExcludedValue {
                value: value.to_string(),
                reason: format!("{} digits (excluded - likely Transport ID)", len),
            });
        }
        7 => {
            // Deferred; the dominant digit is not known yet.
            pending_sevens.push(value);
        }
        _ => {
            result.invalid.push(InvalidValue {
                value: value.to_string(),
                reason: format!("{} digits (expected 8)", len),
            });
        }
    }
}

fn resolve_seven(
    value: &str,
    dominant: Option<char>,
    result: &mut ClassificationResult,
    accepted_set: &mut HashSet<String>,
    occurrences: &HashMap<&str, usize>,
) {
    let Some(digit) = dominant else {
        result.invalid.push(InvalidValue {
            value: value.to_string(),
            reason: "7 digits - needs manual review".to_string(),
        });
        return;
    };

    if value.starts_with(digit) {
        // Prepending would duplicate the digit in an implausible position;
        // the loss is more likely at the end, which is unrecoverable.
        result.invalid.push(InvalidValue {
            value: value.to_string(),
            reason: format!(
                "7 digits - already starts with '{}' (missing last digit, not first)",
                digit
            ),
        });
        return;
    }

    let corrected = format!("{}{}", digit, value);
    apply_correction(
        value,
        &corrected,
        format!("Added leading '{}'", digit),
        result,
        accepted_set,
        occurrences,
    );
}

fn apply_correction(
    original: &str,
    corrected: &str,
    reason: String,
    result: &mut ClassificationResult,
    accepted_set: &mut HashSet<String>,
    occurrences: &HashMap<&str, usize>,
) {
    result.auto_corrections.push(AutoCorrection {
        original: original.to_string(),
        corrected: corrected.to_string(),
        reason,
        confidence: Confidence::High,
    });

    if accepted_set.contains(corrected) {
        // Never double-accept; report the collision instead.
        let count = occurrences.get(corrected).copied().unwrap_or(1) + 1;
        if let Some(entry) = result.duplicates.iter_mut().find(|d| d.value == corrected) {
            entry.count += 1;
        } else {
            result.duplicates.push(DuplicateValue {
                value: corrected.to_string(),
                count,
                reason: format!("Auto-correction of '{}' duplicates an accepted value", original),
            });
        }
        debug!(original, corrected, "correction collides with accepted value");
    } else {
        result.accepted.push(corrected.to_string());
        accepted_set.insert(corrected.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidates(values: &[&str]) -> Vec<Candidate> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        values
            .iter()
            .map(|v| {
                let index = seen.entry(v.to_string()).or_insert(0);
                let candidate = Candidate {
                    value: v.to_string(),
                    source_page: 0,
                    occurrence_index: *index,
                };
                *index += 1;
                candidate
            })
            .collect()
    }

    fn run(values: &[&str]) -> ClassificationResult {
        classify(&candidates(values), &DeliveryConfig::default())
    }

    #[test]
    fn test_eight_digits_accepted_unconditionally() {
        let result = run(&["26996798", "27008029", "27005099", "27010223"]);
        assert_eq!(result.accepted.len(), 4);
        assert_eq!(result.excluded.len(), 0);
        assert_eq!(result.invalid.len(), 0);
    }

    #[test]
    fn test_eight_digits_with_internal_leading_zero() {
        let result = run(&["00652245"]);
        assert_eq!(result.accepted, vec!["00652245".to_string()]);
        assert!(result.auto_corrections.is_empty());
    }

    #[test]
    fn test_nine_digits_excluded() {
        let result = run(&["123456789"]);
        assert!(result.accepted.is_empty());
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].value, "123456789");
        assert!(result.excluded[0].reason.contains("9 digits"));
    }

    #[test]
    fn test_ten_digits_excluded() {
        let result = run(&["1234567890"]);
        assert_eq!(result.excluded.len(), 1);
        assert!(result.excluded[0].reason.contains("10 digits"));
    }

    #[test]
    fn test_leading_zero_correction() {
        let result = run(&["0080652245"]);
        assert_eq!(result.accepted, vec!["80652245".to_string()]);
        assert_eq!(result.auto_corrections.len(), 1);
        assert_eq!(result.auto_corrections[0].original, "0080652245");
        assert_eq!(result.auto_corrections[0].corrected, "80652245");
        assert_eq!(result.auto_corrections[0].reason, "Removed 2 leading zero(s)");
        assert_eq!(result.auto_corrections[0].confidence, Confidence::High);
    }

    #[test]
    fn test_leading_zero_correction_unrecoverable_is_excluded() {
        // Stripping one zero leaves 9 digits.
        let result = run(&["0123456789"]);
        assert!(result.accepted.is_empty());
        assert_eq!(result.excluded.len(), 1);
        assert!(result.excluded[0].reason.contains("10 digits"));
    }

    #[test]
    fn test_leading_zero_collision_goes_to_duplicates() {
        let result = run(&["80652245", "0080652245"]);
        assert_eq!(result.accepted, vec!["80652245".to_string()]);
        assert_eq!(result.auto_corrections.len(), 1);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].value, "80652245");
        assert_eq!(result.duplicates[0].count, 2);
    }

    #[test]
    fn test_seven_digit_correction_with_dominant_digit() {
        let result = run(&["26996798", "27008029", "7180890"]);
        assert_eq!(result.accepted.len(), 3);
        assert!(result.accepted.contains(&"27180890".to_string()));
        assert_eq!(result.auto_corrections.len(), 1);
        assert_eq!(result.auto_corrections[0].original, "7180890");
        assert_eq!(result.auto_corrections[0].corrected, "27180890");
        assert_eq!(result.auto_corrections[0].reason, "Added leading '2'");
    }

    #[test]
    fn test_seven_digit_already_starts_with_dominant() {
        let result = run(&["26996798", "27008029", "27005099", "2715703"]);
        assert_eq!(result.accepted.len(), 3);
        assert_eq!(result.invalid.len(), 1);
        assert_eq!(result.invalid[0].value, "2715703");
        assert!(result.invalid[0].reason.contains("already starts with"));
    }

    #[test]
    fn test_seven_digit_without_dominant_digit() {
        let result = run(&["7180890"]);
        assert_eq!(result.invalid.len(), 1);
        assert_eq!(result.invalid[0].reason, "7 digits - needs manual review");
    }

    #[test]
    fn test_seven_digit_correction_collision() {
        let result = run(&["27180890", "26996798", "7180890"]);
        assert_eq!(result.accepted.len(), 2);
        assert_eq!(result.auto_corrections.len(), 1);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].value, "27180890");
    }

    #[test]
    fn test_other_lengths_invalid() {
        let result = run(&["12345678901", "123456789012"]);
        assert_eq!(result.invalid.len(), 2);
        assert!(result.invalid[0].reason.contains("11 digits (expected 8)"));
        assert!(result.invalid[1].reason.contains("12 digits (expected 8)"));
    }

    #[test]
    fn test_long_value_with_leading_zeros_recovers() {
        // 11 digits, three leading zeros, remainder 8 digits.
        let result = run(&["00080652245"]);
        assert_eq!(result.accepted, vec!["80652245".to_string()]);
        assert_eq!(result.auto_corrections.len(), 1);
        assert_eq!(result.auto_corrections[0].reason, "Removed 3 leading zero(s)");
    }

    #[test]
    fn test_duplicates_reported_alongside_terminal_bucket() {
        let result = run(&["26996798", "26996798", "123456789", "123456789", "123456789"]);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.duplicates.len(), 2);
        assert_eq!(result.duplicates[0].count, 2);
        assert_eq!(result.duplicates[1].count, 3);
    }

    #[test]
    fn test_determinism() {
        let values = ["26996798", "27008029", "7180890", "0080652245", "123456789"];
        let first = run(&values);
        let second = run(&values);
        assert_eq!(first.accepted, second.accepted);
        assert_eq!(first.auto_corrections, second.auto_corrections);
        assert_eq!(first.invalid, second.invalid);
    }
}
