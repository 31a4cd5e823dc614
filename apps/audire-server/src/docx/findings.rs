//! DOCX finding extraction and reinjection
//!
//! A table holds findings when a cell of its first row contains a header
//! keyword; that cell's grid column is the finding column. Every later
//! row with text in that column yields `table_{t}_row_{r}_col_{c}`.
//! Reinjection recomputes the same classification, so the ids resolve to
//! the same cells without any stored state.

use std::collections::HashMap;
use std::ops::Range;

use tracing::debug;

use super::error::DocxResult;
use super::html::{to_html, CellIds};
use super::package::{read_part, replace_part, DOCUMENT_PART};
use super::reader::{read_tables, DocxCell, DocxTable};
use super::writer::run_content;
use super::xml::parse;
use crate::findings::{
    collapse_whitespace, header_keyword_column, FindingCollector, FindingId, FindingsMap,
};

/// HTML and findings of one DOCX
#[derive(Debug, Clone)]
pub struct DocxExtraction {
    pub html: String,
    pub findings: FindingsMap,
    /// Top-level tables in the body
    pub tables: usize,
}

/// Finding column of a table: first header cell holding a keyword
pub fn finding_column(table: &DocxTable) -> Option<usize> {
    table
        .rows
        .first()
        .and_then(|header| header_keyword_column(&header.grid_texts()))
}

/// Candidate cells of every classified table, with their ids
fn finding_cells(tables: &[DocxTable]) -> Vec<(FindingId, &DocxCell)> {
    let mut out = Vec::new();
    for table in tables {
        let Some(col) = finding_column(table) else {
            continue;
        };
        for (r, row) in table.rows.iter().enumerate().skip(1) {
            let Some(cell) = row.cell_at(col) else { continue };
            if collapse_whitespace(&cell.text).is_empty() {
                continue;
            }
            out.push((FindingId::docx_cell(table.index, r, col), cell));
        }
    }
    out
}

/// Convert a DOCX package to HTML and extract its findings
pub fn extract(package: &[u8]) -> DocxResult<DocxExtraction> {
    let xml = read_part(package, DOCUMENT_PART)?;
    let document = parse(&xml)?;
    let tables = read_tables(&document);

    let mut collector = FindingCollector::new();
    let mut ids = CellIds::new();
    for (id, cell) in finding_cells(&tables) {
        let FindingId::DocxCell { table, row, col } = id else {
            continue;
        };
        if let Some(key) = collector.offer_docx_cell(id, &cell.text) {
            ids.insert((table, row, col), key);
        }
    }

    debug!(tables = tables.len(), findings = collector.len(), "Extracted DOCX findings");

    Ok(DocxExtraction {
        html: to_html(&document, &ids),
        findings: collector.into_findings(),
        tables: tables.len(),
    })
}

/// New inner markup for a rewritten cell
///
/// Keeps the cell properties, the first paragraph's properties and the
/// first run's properties; everything else in the cell is replaced by one
/// paragraph holding `text`.
fn cell_markup(xml: &str, cell: &DocxCell, text: &str) -> String {
    let slice = |range: &Option<Range<usize>>| range.clone().map(|r| &xml[r]).unwrap_or("");
    format!(
        "{}<w:p>{}<w:r>{}{}</w:r></w:p>",
        slice(&cell.tc_pr),
        slice(&cell.p_pr),
        slice(&cell.r_pr),
        run_content(text)
    )
}

/// Write approved text back into the cells its ids point at
///
/// Unknown ids are ignored. Returns the updated package and the number of
/// cells rewritten; bytes outside rewritten cells are unchanged.
pub fn reinject(
    package: &[u8],
    approved: &HashMap<String, String>,
) -> DocxResult<(Vec<u8>, usize)> {
    let xml = read_part(package, DOCUMENT_PART)?;
    let document = parse(&xml)?;
    let tables = read_tables(&document);

    let mut edits: Vec<(Range<usize>, String)> = finding_cells(&tables)
        .into_iter()
        .filter_map(|(id, cell)| {
            approved
                .get(&id.to_string())
                .map(|text| (cell.content.clone(), cell_markup(&xml, cell, text)))
        })
        .collect();

    if edits.is_empty() {
        return Ok((package.to_vec(), 0));
    }

    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (range, markup) in &edits {
        out.push_str(&xml[cursor..range.start]);
        out.push_str(markup);
        cursor = range.end;
    }
    out.push_str(&xml[cursor..]);

    debug!(cells = edits.len(), "Reinjected approved findings");
    Ok((replace_part(package, DOCUMENT_PART, out.as_bytes())?, edits.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{build_docx, table};
    use crate::findings::FindingStatus;

    fn sample() -> Vec<u8> {
        let body = format!(
            "<w:p><w:r><w:t>Report</w:t></w:r></w:p>{}{}",
            table(&[&["#", "Finding", "Owner"], &["1", "Password stored in plaintext", "Bob"]]),
            table(&[&["Area", "Notes"], &["x", "not a findings table"]]),
        );
        build_docx(&body)
    }

    #[test]
    fn test_extracts_single_finding() {
        let result = extract(&sample()).unwrap();
        assert_eq!(result.findings.len(), 1);

        let f = &result.findings["table_0_row_1_col_1"];
        assert_eq!(f.original, "Password stored in plaintext");
        assert_eq!(f.refined, f.original);
        assert_eq!(f.stage, 0);
        assert_eq!(f.status, FindingStatus::Processing);
        assert!(result.html.contains("data-finding-id=\"table_0_row_1_col_1\""));
    }

    #[test]
    fn test_ids_reproducible() {
        let a = extract(&sample()).unwrap();
        let b = extract(&sample()).unwrap();
        assert_eq!(a.findings, b.findings);
    }

    #[test]
    fn test_observation_in_third_column() {
        let body = table(&[
            &["Ref", "Owner", "Observation"],
            &["R1", "Ops", "Backups are not tested"],
            &["R2", "IT", ""],
        ]);
        let result = extract(&build_docx(&body)).unwrap();
        let ids: Vec<&String> = result.findings.keys().collect();
        assert_eq!(ids, vec!["table_0_row_1_col_2"]);
    }

    #[test]
    fn test_reinject_rewrites_exact_cell() {
        let package = sample();
        let approved = HashMap::from([
            (
                "table_0_row_1_col_1".to_string(),
                "Credentials are hashed and salted.".to_string(),
            ),
            ("table_7_row_1_col_1".to_string(), "unknown".to_string()),
        ]);

        let (updated, count) = reinject(&package, &approved).unwrap();
        assert_eq!(count, 1);

        let xml = read_part(&updated, DOCUMENT_PART).unwrap();
        let tables = read_tables(&parse(&xml).unwrap());
        assert_eq!(
            tables[0].rows[1].cell_at(1).unwrap().text,
            "Credentials are hashed and salted."
        );

        // Everything outside the rewritten cell is untouched
        let before = read_part(&package, DOCUMENT_PART).unwrap();
        let old_cell = read_tables(&parse(&before).unwrap())[0].rows[1].cell_at(1).unwrap().content.clone();
        let new_cell = tables[0].rows[1].cell_at(1).unwrap().content.clone();
        assert_eq!(&before[..old_cell.start], &xml[..new_cell.start]);
        assert_eq!(&before[old_cell.end..], &xml[new_cell.end..]);
    }

    #[test]
    fn test_reinject_keeps_run_properties() {
        let body = concat!(
            "<w:tbl>",
            "<w:tr><w:tc><w:p><w:r><w:t>Issue</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:tcPr><w:tcW w:w=\"5000\"/></w:tcPr>",
            "<w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>Old text here</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>second paragraph</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>"
        );
        let approved = HashMap::from([("table_0_row_1_col_0".to_string(), "New & improved".to_string())]);
        let (updated, _) = reinject(&build_docx(body), &approved).unwrap();
        let xml = read_part(&updated, DOCUMENT_PART).unwrap();

        assert!(xml.contains(concat!(
            "<w:tc><w:tcPr><w:tcW w:w=\"5000\"/></w:tcPr>",
            "<w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr><w:r><w:rPr><w:i/></w:rPr>",
            "<w:t xml:space=\"preserve\">New &amp; improved</w:t></w:r></w:p></w:tc>"
        )));
        assert!(!xml.contains("second paragraph"));
    }

    #[test]
    fn test_reinject_without_matches_returns_input() {
        let package = sample();
        let (updated, count) = reinject(&package, &HashMap::new()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(updated, package);
    }
}
