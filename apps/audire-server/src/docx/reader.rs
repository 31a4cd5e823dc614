//! Structured table reader for `word/document.xml`
//!
//! Only top-level body tables are read. Cells are placed on the table
//! grid: `w:gridBefore` and `w:gridSpan` shift and widen them, so a cell
//! can be looked up by any grid column it covers.

use std::ops::Range;

use super::xml::XmlElement;

/// Vertical merge state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMerge {
    None,
    /// First cell of a vertically merged group
    Restart,
    /// Covered by the cell above
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocxCell {
    /// First grid column covered
    pub grid_col: usize,
    /// Number of grid columns covered
    pub span: usize,
    pub v_merge: VMerge,
    /// Paragraph texts joined by `\n`
    pub text: String,
    /// Byte range of the cell's content (inside `<w:tc>`)
    pub content: Range<usize>,
    /// `w:tcPr`, kept when the cell is rewritten
    pub tc_pr: Option<Range<usize>>,
    /// `w:pPr` of the first paragraph
    pub p_pr: Option<Range<usize>>,
    /// `w:rPr` of the first run of the first paragraph
    pub r_pr: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocxRow {
    pub cells: Vec<DocxCell>,
}

impl DocxRow {
    /// Cell covering grid column `col`
    pub fn cell_at(&self, col: usize) -> Option<&DocxCell> {
        self.cells
            .iter()
            .find(|c| col >= c.grid_col && col < c.grid_col + c.span)
    }

    /// Texts by grid column, repeating spanned cells
    pub fn grid_texts(&self) -> Vec<Option<String>> {
        let width = self.cells.iter().map(|c| c.grid_col + c.span).max().unwrap_or(0);
        (0..width)
            .map(|col| self.cell_at(col).map(|c| c.text.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocxTable {
    /// 0-based position among the body's tables
    pub index: usize,
    pub rows: Vec<DocxRow>,
}

/// The `w:body` element of a parsed document
pub fn body(document: &XmlElement) -> Option<&XmlElement> {
    if document.is("body") {
        Some(document)
    } else {
        document.child("body")
    }
}

/// Read all top-level tables of a parsed document
pub fn read_tables(document: &XmlElement) -> Vec<DocxTable> {
    let Some(body) = body(document) else {
        return Vec::new();
    };

    body.children_named("tbl")
        .enumerate()
        .map(|(index, tbl)| DocxTable {
            index,
            rows: tbl.children_named("tr").map(read_row).collect(),
        })
        .collect()
}

fn read_row(tr: &XmlElement) -> DocxRow {
    DocxRow {
        cells: row_cells(tr).into_iter().map(|(_, cell)| cell).collect(),
    }
}

/// Cells of a row paired with their `w:tc` elements
pub fn row_cells(tr: &XmlElement) -> Vec<(&XmlElement, DocxCell)> {
    let mut col = tr
        .child("trPr")
        .and_then(|pr| pr.child_val("gridBefore"))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut cells = Vec::new();
    for tc in cells_of(tr) {
        let tc_pr = tc.child("tcPr");
        let span = tc_pr
            .and_then(|pr| pr.child_val("gridSpan"))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let v_merge = match tc_pr.and_then(|pr| pr.child("vMerge")) {
            None => VMerge::None,
            Some(vm) if vm.attr("val") == Some("restart") => VMerge::Restart,
            Some(_) => VMerge::Continue,
        };

        let first_p = tc.child("p");
        let p_pr = first_p.and_then(|p| p.child("pPr")).map(|e| e.span.clone());
        let r_pr = first_p
            .and_then(first_run)
            .and_then(|r| r.child("rPr"))
            .map(|e| e.span.clone());

        cells.push((
            tc,
            DocxCell {
                grid_col: col,
                span,
                v_merge,
                text: cell_text(tc),
                content: tc.content.clone(),
                tc_pr: tc_pr.map(|e| e.span.clone()),
                p_pr,
                r_pr,
            },
        ));
        col += span;
    }

    cells
}

/// `w:tc` children of a row, looking through content controls
fn cells_of(tr: &XmlElement) -> Vec<&XmlElement> {
    let mut out = Vec::new();
    for el in tr.elements() {
        if el.is("tc") {
            out.push(el);
        } else if el.is("sdt") {
            if let Some(content) = el.child("sdtContent") {
                out.extend(content.children_named("tc"));
            }
        }
    }
    out
}

fn first_run(p: &XmlElement) -> Option<&XmlElement> {
    p.elements().find_map(|el| {
        if el.is("r") {
            Some(el)
        } else if el.is("hyperlink") || el.is("ins") || el.is("smartTag") {
            first_run(el)
        } else {
            None
        }
    })
}

/// Text of a cell: its direct paragraphs joined by `\n`
pub fn cell_text(tc: &XmlElement) -> String {
    tc.children_named("p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of a paragraph's runs
pub fn paragraph_text(p: &XmlElement) -> String {
    let mut out = String::new();
    collect_runs(p, &mut out);
    out
}

fn collect_runs(container: &XmlElement, out: &mut String) {
    for el in container.elements() {
        match el.local() {
            "r" => run_text(el, out),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" => collect_runs(el, out),
            _ => {}
        }
    }
}

/// Text of a single run
pub fn run_text(r: &XmlElement, out: &mut String) {
    for el in r.elements() {
        match el.local() {
            "t" => out.push_str(&el.text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}
