//! Digit-loss auto-correction heuristics.
//!
//! Two independent repair paths feed the classifier: stripping leading
//! zeros from 9+-digit values, and prepending the document's dominant
//! leading digit to truncated 7-digit values.

use tracing::debug;

/// Strip leading zeros from a corrupted candidate.
///
/// Returns the stripped value and the number of zeros removed, but only
/// when the stripped remainder is exactly 8 digits; anything else is not a
/// recoverable delivery-note number.
pub fn strip_leading_zeros(value: &str) -> Option<(String, usize)> {
    let stripped = value.trim_start_matches('0');
    let removed = value.len() - stripped.len();
    if removed > 0 && stripped.len() == 8 {
        Some((stripped.to_string(), removed))
    } else {
        None
    }
}

/// Compute the dominant leading digit over the accepted values.
///
/// The most frequent first digit qualifies only when its frequency is at
/// least `max(1, min_share × accepted.len())`. Ties break to the lowest
/// digit value, which keeps the result independent of processing order.
pub fn dominant_digit(accepted: &[String], min_share: f64) -> Option<char> {
    if accepted.is_empty() {
        return None;
    }

    let mut histogram = [0usize; 10];
    for value in accepted {
        if let Some(d) = value.chars().next().and_then(|c| c.to_digit(10)) {
            histogram[d as usize] += 1;
        }
    }

    // Strictly-greater comparison scanning 0..=9 keeps the lowest digit
    // on a tie.
    let mut digit = 0usize;
    let mut count = 0usize;
    for (d, &c) in histogram.iter().enumerate() {
        if c > count {
            digit = d;
            count = c;
        }
    }
    if count == 0 {
        return None;
    }

    let required = (min_share * accepted.len() as f64).max(1.0);
    if (count as f64) < required {
        debug!(
            "no dominant digit: best '{}' appears {} of {} times (need {:.1})",
            digit,
            count,
            accepted.len(),
            required
        );
        return None;
    }

    char::from_digit(digit as u32, 10)
}
