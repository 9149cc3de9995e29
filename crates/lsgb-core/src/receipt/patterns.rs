//! Regex patterns for confirmation-of-receipt anchor search.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Direct anchors: label phrase with the number token immediately
    // trailing. The token class admits digits plus the OCR confusions the
    // normalizer repairs, and whitespace injected mid-number.
    pub static ref DIRECT_ANCHORS: Vec<Regex> = vec![
        Regex::new(
            r"(?i)No\.?\s*of\s*confirmation\s*of\s*receipt[\s:.]*([0-9OIlSsQBG][0-9OIlSsQBG\s]{2,12}[0-9OIlSsQBG])"
        ).unwrap(),
        Regex::new(
            r"(?i)confirmation\s*of\s*receipt(?:\s*no\.?)?[\s:.]*([0-9OIlSsQBG][0-9OIlSsQBG\s]{2,12}[0-9OIlSsQBG])"
        ).unwrap(),
        Regex::new(
            r"(?i)Gelangensbest(?:ä|a)tigung(?:en|snummer|s-Nr\.?)?(?:\s*Nr\.?)?[\s:.]*([0-9OIlSsQBG][0-9OIlSsQBG\s]{2,12}[0-9OIlSsQBG])"
        ).unwrap(),
    ];

    // Label phrases for the near-anchor window strategies.
    pub static ref ANCHOR_LABEL: Regex = Regex::new(
        r"(?i)(?:No\.?\s*of\s*)?confirmation\s*of\s*receipt|Gelangensbest(?:ä|a)tigung(?:en|snummer)?"
    ).unwrap();

    // Broader synonyms for the loose window and the global fallback.
    pub static ref BROAD_LABEL: Regex = Regex::new(
        r"(?i)Gelangensbest(?:ä|a)tigung|Empfangsbest(?:ä|a)tigung|confirmation\s*of\s*receipt|Best(?:ä|a)tigung|receipt\s*no"
    ).unwrap();

    // Bare token shapes searched inside windows.
    pub static ref H01_TOKEN: Regex = Regex::new(r"\b5\d{5}\b").unwrap();
    pub static ref EP1_TOKEN: Regex = Regex::new(r"\b1\d{7}\b").unwrap();

    // Accepted canonical shapes.
    pub static ref EP1_SHAPE: Regex = Regex::new(r"^1\d{7}$").unwrap();
    pub static ref H01_SHAPE: Regex = Regex::new(r"^5\d{5}$").unwrap();

    // A number immediately followed by whitespace then 2+ letters reads as
    // a postal code with a city name, not an identifier.
    pub static ref POSTAL_TAIL: Regex = Regex::new(r"^[ \t]+[[:alpha:]]{2}").unwrap();

    // Context patterns marking a number as part of an address or
    // pagination rather than an identifier.
    pub static ref EXCLUSION_CONTEXTS: Vec<Regex> = vec![
        // Street address with a country-coded postal prefix.
        Regex::new(r"(?i)\b(?:D|DE|AT|CH|NL|BE|FR|PL)-\d{4,5}\s+[[:alpha:]]").unwrap(),
        // Long DE-prefixed numbers (VAT IDs and the like).
        Regex::new(r"(?i)\bDE\s?\d{9,}").unwrap(),
        // Pagination footers.
        Regex::new(r"(?i)\b(?:Page|Seite)\s*:?\s*\d+\s*(?:of|von|/)\s*\d+").unwrap(),
    ];
}
