//! Minimal DOCX writer
//!
//! Produces a package with just enough parts for word processors and
//! LibreOffice to open it: content types, the package relationship and
//! `word/document.xml`. Used to export reconstructed PDFs.

use std::fmt::Write;

use super::error::DocxResult;
use super::package::{write_package, DOCUMENT_PART};
use super::xml::escape;
use crate::pdf::{PageElement, RenderedTable, TextTag};

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:body>"#
);

const DOCUMENT_CLOSE: &str = "</w:body></w:document>";

const TABLE_BORDERS: &str = concat!(
    "<w:tblBorders>",
    r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="999999"/>"#,
    "</w:tblBorders>"
);

/// Wrap body markup into a complete package
pub fn package_from_body(body: &str) -> DocxResult<Vec<u8>> {
    let document = format!("{DOCUMENT_OPEN}{body}{DOCUMENT_CLOSE}");
    write_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        (DOCUMENT_PART, document.as_bytes()),
    ])
}

/// Run content for plain text: tabs and line breaks become their elements
pub fn run_content(text: &str) -> String {
    let mut out = String::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        for (j, part) in line.split('\t').enumerate() {
            if j > 0 {
                out.push_str("<w:tab/>");
            }
            if !part.is_empty() {
                let _ = write!(out, r#"<w:t xml:space="preserve">{}</w:t>"#, escape(part));
            }
        }
    }
    out
}

fn paragraph(text: &str, bold: bool, style: Option<&str>) -> String {
    let mut out = String::from("<w:p>");
    if let Some(style) = style {
        let _ = write!(out, r#"<w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#);
    }
    out.push_str("<w:r>");
    if bold {
        out.push_str("<w:rPr><w:b/></w:rPr>");
    }
    out.push_str(&run_content(text));
    out.push_str("</w:r></w:p>");
    out
}

fn table(t: &RenderedTable) -> String {
    let columns = t
        .rows
        .iter()
        .flatten()
        .map(|c| c.col + c.colspan)
        .max()
        .unwrap_or(0);

    let mut out = format!(r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/>{TABLE_BORDERS}</w:tblPr><w:tblGrid>"#);
    for _ in 0..columns {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    // Rows still covered by a vertical merge, per grid column: (remaining, colspan)
    let mut covered: Vec<Option<(usize, usize)>> = vec![None; columns];

    for (r, row) in t.rows.iter().enumerate() {
        let bold = t.header && r == 0;
        out.push_str("<w:tr>");
        if bold {
            out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
        }

        let mut col = 0;
        while col < columns {
            if let Some(cell) = row.iter().find(|c| c.col == col) {
                out.push_str("<w:tc><w:tcPr>");
                if cell.colspan > 1 {
                    let _ = write!(out, r#"<w:gridSpan w:val="{}"/>"#, cell.colspan);
                }
                if cell.rowspan > 1 {
                    out.push_str(r#"<w:vMerge w:val="restart"/>"#);
                    covered[col] = Some((cell.rowspan - 1, cell.colspan));
                }
                out.push_str("</w:tcPr>");
                for line in cell.text.split('\n') {
                    out.push_str(&paragraph(line, bold, None));
                }
                out.push_str("</w:tc>");
                col += cell.colspan.max(1);
            } else if let Some((remaining, span)) = covered[col] {
                out.push_str("<w:tc><w:tcPr>");
                if span > 1 {
                    let _ = write!(out, r#"<w:gridSpan w:val="{span}"/>"#);
                }
                out.push_str("<w:vMerge/></w:tcPr><w:p/></w:tc>");
                covered[col] = (remaining > 1).then(|| (remaining - 1, span));
                col += span.max(1);
            } else {
                out.push_str("<w:tc><w:p/></w:tc>");
                col += 1;
            }
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    // Word requires a paragraph between adjacent tables
    out.push_str("<w:p/>");
    out
}

/// Write reconstructed PDF pages as a DOCX package
pub fn write_elements(pages: &[Vec<PageElement>]) -> DocxResult<Vec<u8>> {
    let mut body = String::new();

    for (i, elements) in pages.iter().enumerate() {
        if i > 0 {
            body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        for element in elements {
            match element {
                PageElement::Text(t) => {
                    let style = t.tag.heading_level().map(|l| format!("Heading{l}"));
                    body.push_str(&paragraph(&t.text, t.tag != TextTag::P, style.as_deref()));
                }
                PageElement::Table(t) => body.push_str(&table(t)),
            }
        }
    }

    package_from_body(&body)
}
