//! Confirmation-of-receipt identifier location and page grouping.
//!
//! Confirmation-of-receipt documents carry one identifier per logical
//! document, printed next to a label phrase ("No. of confirmation of
//! receipt", "Gelangensbestätigung"). The locator searches each page with a
//! strict-to-loose strategy cascade; the grouper then merges consecutive
//! pages sharing one identifier into logical units.

pub mod grouper;
pub mod locator;
pub mod patterns;

use serde::{Deserialize, Serialize};

pub use crate::delivery::Confidence;

/// Shape class of a located identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierType {
    /// 8 digits with leading `1`.
    Ep1,
    /// 6 digits with leading `5`.
    H01,
    /// Shape not recognized.
    Unknown,
}

impl IdentifierType {
    /// Classify a normalized digit string by shape.
    pub fn from_value(value: &str) -> Self {
        if patterns::EP1_SHAPE.is_match(value) {
            IdentifierType::Ep1
        } else if patterns::H01_SHAPE.is_match(value) {
            IdentifierType::H01
        } else {
            IdentifierType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Ep1 => "EP1",
            IdentifierType::H01 => "H01",
            IdentifierType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which search strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    /// Label phrase with the number token immediately trailing.
    DirectAnchor,
    /// Bare token inside a bounded window after a label phrase.
    NearAnchor,
    /// Whole-document scan with context filtering.
    Global,
}

/// A located confirmation-of-receipt identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierMatch {
    /// Canonical digit value.
    pub value: String,
    /// Shape class of the value.
    pub id_type: IdentifierType,
    /// Raw token as it appeared in the text, before normalization.
    pub raw_token: String,
    /// Strategy that found it.
    pub strategy: SourceStrategy,
    /// Confidence tier derived from the strategy.
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_type_shapes() {
        assert_eq!(IdentifierType::from_value("12345678"), IdentifierType::Ep1);
        assert_eq!(IdentifierType::from_value("577770"), IdentifierType::H01);
        assert_eq!(IdentifierType::from_value("22345678"), IdentifierType::Unknown);
        assert_eq!(IdentifierType::from_value("677770"), IdentifierType::Unknown);
        assert_eq!(IdentifierType::from_value(""), IdentifierType::Unknown);
    }
}
