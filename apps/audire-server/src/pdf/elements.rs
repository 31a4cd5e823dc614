//! Reconstructed page elements
//!
//! The reconstructor's output before it is flattened to HTML. Keeping the
//! structure lets export substitute approved text by finding id and write
//! the page back out as a word-processing document.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

const TABLE_STYLE: &str = "border-collapse:collapse;width:100%;margin:8px 0;";
const CELL_STYLE: &str = "border:1px solid #999;padding:4px;vertical-align:top;";
const HEADER_CELL_STYLE: &str =
    "border:1px solid #999;padding:4px;vertical-align:top;background:#f0f0f0;font-weight:bold;text-align:left;";

/// Block-level tag for a standalone line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTag {
    H1,
    H2,
    H3,
    P,
}

impl TextTag {
    /// Heading level from the largest font size on a line
    pub fn from_font_size(size: f32) -> Self {
        if size > 15.0 {
            TextTag::H1
        } else if size > 13.0 {
            TextTag::H2
        } else if size > 11.0 {
            TextTag::H3
        } else {
            TextTag::P
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextTag::H1 => "h1",
            TextTag::H2 => "h2",
            TextTag::H3 => "h3",
            TextTag::P => "p",
        }
    }

    /// Heading level, `None` for paragraphs
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            TextTag::H1 => Some(1),
            TextTag::H2 => Some(2),
            TextTag::H3 => Some(3),
            TextTag::P => None,
        }
    }
}

/// A standalone line rendered as a heading or paragraph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextElement {
    pub tag: TextTag,
    pub html: String,
    pub text: String,
    pub finding_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    /// Grid column of the cell's left edge
    pub col: usize,
    pub html: String,
    pub text: String,
    pub finding_id: Option<String>,
    pub colspan: usize,
    pub rowspan: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    /// Row 0 is a header row
    pub header: bool,
    pub rows: Vec<Vec<RenderedCell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageElement {
    Text(TextElement),
    Table(RenderedTable),
}

fn id_attr(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" data-finding-id=\"{}\"", html_escape::encode_double_quoted_attribute(id)),
        None => String::new(),
    }
}

impl PageElement {
    pub fn to_html(&self) -> String {
        match self {
            PageElement::Text(t) => {
                let tag = t.tag.as_str();
                format!("<{tag}{}>{}</{tag}>", id_attr(&t.finding_id), t.html)
            }
            PageElement::Table(table) => table.to_html(),
        }
    }

    /// Replace the text of every element whose finding id is in `approved`
    ///
    /// Returns how many elements were rewritten.
    pub fn apply_approved(&mut self, approved: &HashMap<String, String>) -> usize {
        let replace = |id: &Option<String>, text: &mut String, html: &mut String| -> usize {
            match id.as_ref().and_then(|id| approved.get(id)) {
                Some(new) => {
                    *text = new.clone();
                    *html = html_escape::encode_text(new).into_owned();
                    1
                }
                None => 0,
            }
        };

        match self {
            PageElement::Text(t) => replace(&t.finding_id, &mut t.text, &mut t.html),
            PageElement::Table(table) => table
                .rows
                .iter_mut()
                .flatten()
                .map(|c| replace(&c.finding_id, &mut c.text, &mut c.html))
                .sum(),
        }
    }
}

impl RenderedTable {
    pub fn to_html(&self) -> String {
        let mut out = format!("<table style=\"{TABLE_STYLE}\">");
        for (r, row) in self.rows.iter().enumerate() {
            let (tag, style) = if self.header && r == 0 {
                ("th", HEADER_CELL_STYLE)
            } else {
                ("td", CELL_STYLE)
            };
            out.push_str("<tr>");
            for cell in row {
                let _ = write!(out, "<{tag} style=\"{style}\"");
                if cell.colspan > 1 {
                    let _ = write!(out, " colspan=\"{}\"", cell.colspan);
                }
                if cell.rowspan > 1 {
                    let _ = write!(out, " rowspan=\"{}\"", cell.rowspan);
                }
                let _ = write!(out, "{}>{}</{tag}>", id_attr(&cell.finding_id), cell.html);
            }
            out.push_str("</tr>");
        }
        out.push_str("</table>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str, id: Option<&str>) -> RenderedCell {
        RenderedCell {
            col: 0,
            html: text.to_string(),
            text: text.to_string(),
            finding_id: id.map(String::from),
            colspan: 1,
            rowspan: 1,
        }
    }

    #[test]
    fn test_heading_buckets() {
        assert_eq!(TextTag::from_font_size(16.0), TextTag::H1);
        assert_eq!(TextTag::from_font_size(15.0), TextTag::H2);
        assert_eq!(TextTag::from_font_size(13.5), TextTag::H2);
        assert_eq!(TextTag::from_font_size(12.0), TextTag::H3);
        assert_eq!(TextTag::from_font_size(11.0), TextTag::P);
    }

    #[test]
    fn test_table_html_marks_header_and_findings() {
        let table = RenderedTable {
            header: true,
            rows: vec![
                vec![cell("#", None), cell("Finding", None)],
                vec![cell("1", None), cell("Weak passwords", Some("page_0_table_0_row_1_col_1"))],
            ],
        };
        let html = table.to_html();
        assert!(html.starts_with("<table"));
        assert_eq!(html.matches("<th ").count(), 2);
        assert_eq!(html.matches("<td ").count(), 2);
        assert!(html.contains("data-finding-id=\"page_0_table_0_row_1_col_1\">Weak passwords</td>"));
    }

    #[test]
    fn test_apply_approved_rewrites_only_matching_ids() {
        let mut el = PageElement::Table(RenderedTable {
            header: false,
            rows: vec![vec![cell("a & b", Some("x")), cell("keep", Some("y"))]],
        });
        let approved = HashMap::from([("x".to_string(), "fixed <now>".to_string())]);

        assert_eq!(el.apply_approved(&approved), 1);
        let PageElement::Table(t) = &el else { unreachable!() };
        assert_eq!(t.rows[0][0].text, "fixed <now>");
        assert_eq!(t.rows[0][0].html, "fixed &lt;now&gt;");
        assert_eq!(t.rows[0][1].text, "keep");
    }

    #[test]
    fn test_text_element_html() {
        let el = PageElement::Text(TextElement {
            tag: TextTag::P,
            html: "<span>Finding: no MFA</span>".into(),
            text: "Finding: no MFA".into(),
            finding_id: Some("page_0_block_1_line_0".into()),
        });
        assert_eq!(
            el.to_html(),
            "<p data-finding-id=\"page_0_block_1_line_0\"><span>Finding: no MFA</span></p>"
        );
    }
}
