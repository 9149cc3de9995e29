//! Grouping of consecutive pages by identifier.
//!
//! Multi-page confirmation documents usually carry the identifier only on
//! the first page; trailing pages (signature-only, attachments) have none.
//! A single forward pass with bounded lookahead assigns every page to a
//! group, trading perfect grouping for linear-time, deterministic behavior
//! on noisy OCR.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::config::GroupingConfig;

use super::{IdentifierMatch, IdentifierType};

/// One page of a document as seen by the grouper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Zero-based page index.
    pub page_index: usize,
    /// One-based page number.
    pub page_num: u32,
    /// Text extracted for this page.
    pub extracted_text: String,
    /// Whether the text came from the OCR fallback.
    pub used_ocr: bool,
    /// Identifier located on this page, if any.
    pub identifier: Option<IdentifierMatch>,
}

/// A run of pages belonging to one logical document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageGroup {
    /// Shared identifier value; `None` only for groups that never resolved
    /// one (not produced by [`group_pages`], which drops such orphans).
    pub identifier_value: Option<String>,
    /// Shape class of the identifier.
    pub id_type: IdentifierType,
    /// Member pages, in document order.
    pub pages: Vec<PageRecord>,
}

impl PageGroup {
    /// One-based inclusive page range, e.g. `"3-5"` or `"2"`.
    pub fn page_range(&self) -> String {
        match (self.pages.first(), self.pages.last()) {
            (Some(first), Some(last)) if first.page_num != last.page_num => {
                format!("{}-{}", first.page_num, last.page_num)
            }
            (Some(first), _) => first.page_num.to_string(),
            _ => String::new(),
        }
    }

    /// The representative page for region analysis: the last page of the
    /// group, where stamp and signature are expected.
    pub fn representative_page(&self) -> Option<&PageRecord> {
        self.pages.last()
    }
}

/// Result of grouping: the groups plus the page indices of orphans that
/// could not be attached anywhere.
#[derive(Debug, Clone, Default)]
pub struct GroupingOutcome {
    pub groups: Vec<PageGroup>,
    pub dropped_pages: Vec<usize>,
}

/// Group pages by identifier in a single forward pass.
///
/// - a page repeating the open group's identifier extends the group;
/// - a page with a different identifier closes it and opens a new one;
/// - a page with no identifier joins the open group; with no group open it
///   looks ahead up to `orphan_lookahead` pages for an identifier to anchor
///   a new group, otherwise it is dropped and reported.
///
/// A post-pass merges groups that share an identifier value, which heals
/// runs split by an intervening page where detection failed.
pub fn group_pages(pages: &[PageRecord], config: &GroupingConfig) -> GroupingOutcome {
    let mut outcome = GroupingOutcome::default();
    let mut open: Option<PageGroup> = None;

    for (i, page) in pages.iter().enumerate() {
        match &page.identifier {
            Some(found) => {
                let matches_open = open
                    .as_ref()
                    .is_some_and(|g| g.identifier_value.as_deref() == Some(found.value.as_str()));
                if matches_open {
                    if let Some(group) = open.as_mut() {
                        group.pages.push(page.clone());
                    }
                } else {
                    if let Some(group) = open.take() {
                        outcome.groups.push(group);
                    }
                    open = Some(PageGroup {
                        identifier_value: Some(found.value.clone()),
                        id_type: found.id_type,
                        pages: vec![page.clone()],
                    });
                }
            }
            None => {
                if let Some(group) = open.as_mut() {
                    // Identifier-less pages belong to the preceding document.
                    group.pages.push(page.clone());
                } else if let Some(future) = lookahead(pages, i, config.orphan_lookahead) {
                    debug!(
                        page = page.page_num,
                        identifier = %future.value,
                        "orphan page anchored to upcoming identifier"
                    );
                    open = Some(PageGroup {
                        identifier_value: Some(future.value.clone()),
                        id_type: future.id_type,
                        pages: vec![page.clone()],
                    });
                } else {
                    warn!(page = page.page_num, "no identifier found for orphan page, dropping");
                    outcome.dropped_pages.push(page.page_index);
                }
            }
        }
    }

    if let Some(group) = open.take() {
        outcome.groups.push(group);
    }

    outcome.groups = merge_same_identifier(outcome.groups);
    outcome
}

/// Find the identifier of the next identifier-bearing page within the
/// lookahead window after `from` (exclusive).
fn lookahead(pages: &[PageRecord], from: usize, window: usize) -> Option<&IdentifierMatch> {
    pages
        .iter()
        .skip(from + 1)
        .take(window)
        .find_map(|p| p.identifier.as_ref())
}

/// Merge groups sharing an identifier value, preserving first-seen order.
fn merge_same_identifier(groups: Vec<PageGroup>) -> Vec<PageGroup> {
    let mut merged: Vec<PageGroup> = Vec::with_capacity(groups.len());

    for group in groups {
        let existing = merged
            .iter_mut()
            .find(|g| g.identifier_value == group.identifier_value);
        match existing {
            Some(target) => {
                debug!(
                    identifier = target.identifier_value.as_deref().unwrap_or(""),
                    "merging re-detected identifier group"
                );
                target.pages.extend(group.pages);
            }
            None => merged.push(group),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::{Confidence, SourceStrategy};

    fn page(index: usize, value: Option<&str>) -> PageRecord {
        PageRecord {
            page_index: index,
            page_num: (index + 1) as u32,
            extracted_text: String::new(),
            used_ocr: false,
            identifier: value.map(|v| IdentifierMatch {
                value: v.to_string(),
                id_type: IdentifierType::from_value(v),
                raw_token: v.to_string(),
                strategy: SourceStrategy::DirectAnchor,
                confidence: Confidence::High,
            }),
        }
    }

    fn config() -> GroupingConfig {
        GroupingConfig::default()
    }

    #[test]
    fn test_trailing_pages_join_group() {
        // Identifier only on page 1 of 3.
        let pages = vec![page(0, Some("577770")), page(1, None), page(2, None)];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].identifier_value.as_deref(), Some("577770"));
        assert_eq!(outcome.groups[0].pages.len(), 3);
        assert!(outcome.dropped_pages.is_empty());
    }

    #[test]
    fn test_distinct_identifiers_split_groups() {
        let pages = vec![
            page(0, Some("577770")),
            page(1, None),
            page(2, Some("577771")),
        ];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(outcome.groups[0].pages.len(), 2);
        assert_eq!(outcome.groups[1].pages.len(), 1);
    }

    #[test]
    fn test_leading_orphan_anchors_to_lookahead() {
        let pages = vec![page(0, None), page(1, Some("577770")), page(2, None)];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].pages.len(), 3);
        assert_eq!(outcome.groups[0].pages[0].page_index, 0);
    }

    #[test]
    fn test_orphan_beyond_lookahead_dropped() {
        // Next identifier is 3 pages away, beyond the default window of 2.
        let pages = vec![
            page(0, None),
            page(1, None),
            page(2, None),
            page(3, Some("577770")),
        ];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.dropped_pages, vec![0]);
        // Page 1 sees the identifier within its window and anchors a
        // group; page 2 then joins that open group.
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].pages.len(), 3);
    }

    #[test]
    fn test_all_orphans_dropped() {
        let pages = vec![page(0, None), page(1, None)];
        let outcome = group_pages(&pages, &config());
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.dropped_pages, vec![0, 1]);
    }

    #[test]
    fn test_reappearing_identifier_merges() {
        // Identifier drops out on page 2 of a different document and
        // reappears on page 3.
        let pages = vec![
            page(0, Some("577770")),
            page(1, Some("577771")),
            page(2, Some("577770")),
            page(3, None),
        ];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.groups.len(), 2);
        let first = &outcome.groups[0];
        assert_eq!(first.identifier_value.as_deref(), Some("577770"));
        assert_eq!(first.pages.len(), 3);
        assert_eq!(outcome.groups[1].pages.len(), 1);
    }

    #[test]
    fn test_page_range() {
        let pages = vec![page(2, Some("577770")), page(3, None)];
        let outcome = group_pages(&pages, &config());
        assert_eq!(outcome.groups[0].page_range(), "3-4");
        assert_eq!(
            outcome.groups[0].representative_page().unwrap().page_index,
            3
        );
    }

    #[test]
    fn test_custom_lookahead() {
        let pages = vec![
            page(0, None),
            page(1, None),
            page(2, None),
            page(3, Some("577770")),
        ];
        let wide = GroupingConfig { orphan_lookahead: 3 };
        let outcome = group_pages(&pages, &wide);
        assert!(outcome.dropped_pages.is_empty());
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].pages.len(), 4);
    }
}
