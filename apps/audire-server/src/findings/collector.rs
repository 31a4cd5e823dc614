//! Finding collection heuristics
//!
//! The collector is fed candidate cells and lines while a document is
//! being walked and keeps the ones that pass the extraction rules.
//! Rejections are silent: under-extracting is preferred to failing on
//! irregular documents.

use super::ids::FindingId;
use super::types::{Finding, FindingsMap};

/// Table cells must be longer than this (in characters) to count
pub const MIN_CELL_CHARS: usize = 10;

/// Prefixes that mark a standalone line as a finding
pub const LINE_PREFIXES: &[&str] = &["finding:", "issue:", "gap:"];

/// Trim and collapse internal runs of whitespace to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a collapsed line starts with a finding prefix
pub fn has_finding_prefix(text: &str) -> bool {
    let lower = text.to_lowercase();
    LINE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Accumulates findings for one document
#[derive(Debug, Default)]
pub struct FindingCollector {
    findings: FindingsMap,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a table cell from the finding column of a non-header row
    ///
    /// Returns the id when the cell was accepted.
    pub fn offer_cell(&mut self, id: FindingId, raw: &str) -> Option<String> {
        let text = collapse_whitespace(raw);
        if text.chars().count() <= MIN_CELL_CHARS {
            return None;
        }
        self.insert(id, text)
    }

    /// Offer a standalone line of plain text
    pub fn offer_line(&mut self, id: FindingId, raw: &str) -> Option<String> {
        let text = collapse_whitespace(raw);
        if !has_finding_prefix(&text) {
            return None;
        }
        self.insert(id, text)
    }

    /// Offer a DOCX cell; any non-empty text qualifies
    pub fn offer_docx_cell(&mut self, id: FindingId, raw: &str) -> Option<String> {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return None;
        }
        self.insert(id, text)
    }

    fn insert(&mut self, id: FindingId, text: String) -> Option<String> {
        let key = id.to_string();
        if self.findings.contains_key(&key) {
            tracing::debug!(id = %key, "Duplicate finding id ignored");
            return None;
        }
        self.findings.insert(key.clone(), Finding::new(key.clone(), text));
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_findings(self) -> FindingsMap {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  Password\n stored\t\tin   plaintext "),
            "Password stored in plaintext"
        );
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_cell_length_threshold() {
        let mut collector = FindingCollector::new();

        // 9 visible characters
        assert!(collector.offer_cell(FindingId::pdf_cell(0, 0, 1, 1), "No backup").is_none());
        // exactly 10
        assert!(collector.offer_cell(FindingId::pdf_cell(0, 0, 2, 1), "No backups").is_none());
        // 11
        assert!(collector.offer_cell(FindingId::pdf_cell(0, 0, 3, 1), "No backups!").is_some());
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_threshold_counts_collapsed_text() {
        let mut collector = FindingCollector::new();
        assert!(collector
            .offer_cell(FindingId::pdf_cell(0, 0, 1, 1), "   No    backup   ")
            .is_none());
    }

    #[test]
    fn test_line_prefixes() {
        let mut collector = FindingCollector::new();

        let id = collector
            .offer_line(FindingId::pdf_line(0, 3, 0), "  FINDING:  no MFA\u{a0}enforced ")
            .unwrap();
        assert!(collector
            .offer_line(FindingId::pdf_line(0, 3, 1), "Gap: no DR plan")
            .is_some());
        assert!(collector
            .offer_line(FindingId::pdf_line(0, 3, 2), "Observation: ignored")
            .is_none());
        assert!(collector
            .offer_line(FindingId::pdf_line(0, 3, 3), "The finding: mid-sentence")
            .is_none());

        let findings = collector.into_findings();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[&id].original, "FINDING: no MFA enforced");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut collector = FindingCollector::new();
        let id = FindingId::docx_cell(0, 1, 1);

        assert!(collector.offer_docx_cell(id, "first").is_some());
        assert!(collector.offer_docx_cell(id, "second").is_none());
        assert_eq!(collector.into_findings()["table_0_row_1_col_1"].original, "first");
    }

    #[test]
    fn test_docx_cell_requires_text() {
        let mut collector = FindingCollector::new();
        assert!(collector.offer_docx_cell(FindingId::docx_cell(0, 1, 0), " \n ").is_none());
        assert!(collector.is_empty());
    }
}
