//! Manifest rows for the flat tabular export.
//!
//! Every input document yields at least one row, including documents that
//! failed to process (status `Error`). In confirmation-of-receipt mode a
//! document yields one row per identifier group.

use serde::{Deserialize, Serialize};

/// Processing status of a document or identifier group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Processed successfully.
    Ok,
    /// No identifier could be located on any page of the span.
    NoIdentifier,
    /// Document carries a digital signature; passed through unmodified,
    /// region analysis skipped.
    Signed,
    /// Infrastructure failure while processing the document.
    Error,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Ok => "OK",
            DocumentStatus::NoIdentifier => "NO_IDENTIFIER",
            DocumentStatus::Signed => "SIGNED",
            DocumentStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One row of the cross-document manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Input file name.
    pub input: String,

    /// Total pages in the source document.
    pub total_pages: u32,

    /// Output artifact for this row, if one was written.
    pub output_file: Option<String>,

    /// Canonical identifier value, if located.
    pub identifier: Option<String>,

    /// Identifier type name (`EP1`, `H01`, `UNKNOWN`).
    pub id_type: String,

    /// Row status.
    pub status: DocumentStatus,

    /// Stamp verification status, if region analysis ran.
    pub stamp_status: Option<String>,

    /// Signature verification status, if region analysis ran.
    pub signature_status: Option<String>,

    /// Page range covered by this row, 1-based inclusive (`"3-5"`).
    pub pages: String,

    /// Free-form notes (warnings, error messages, skip reasons).
    pub notes: String,
}

impl ManifestRow {
    /// Column headers matching the row serialization order.
    pub const HEADERS: [&'static str; 10] = [
        "Input",
        "TotalPages",
        "OutputFile",
        "Identifier",
        "Type",
        "Status",
        "StampStatus",
        "SignatureStatus",
        "Pages",
        "Notes",
    ];

    /// Flatten the row into string fields for CSV export.
    pub fn to_record(&self) -> [String; 10] {
        [
            self.input.clone(),
            self.total_pages.to_string(),
            self.output_file.clone().unwrap_or_default(),
            self.identifier.clone().unwrap_or_default(),
            self.id_type.clone(),
            self.status.to_string(),
            self.stamp_status.clone().unwrap_or_default(),
            self.signature_status.clone().unwrap_or_default(),
            self.pages.clone(),
            self.notes.clone(),
        ]
    }

    /// Error row for a document that could not be processed at all.
    pub fn error(input: &str, message: &str) -> Self {
        Self {
            input: input.to_string(),
            total_pages: 0,
            output_file: None,
            identifier: None,
            id_type: "UNKNOWN".to_string(),
            status: DocumentStatus::Error,
            stamp_status: None,
            signature_status: None,
            pages: String::new(),
            notes: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_row() {
        let row = ManifestRow::error("broken.pdf", "failed to parse PDF: bad xref");
        assert_eq!(row.status, DocumentStatus::Error);
        assert_eq!(row.to_record()[0], "broken.pdf");
        assert_eq!(row.to_record()[5], "ERROR");
        assert!(row.to_record()[9].contains("bad xref"));
    }

    #[test]
    fn test_record_matches_headers() {
        let row = ManifestRow::error("a.pdf", "x");
        assert_eq!(row.to_record().len(), ManifestRow::HEADERS.len());
    }
}
