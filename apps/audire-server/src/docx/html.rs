//! DOCX to HTML conversion
//!
//! A small semantic converter in the spirit of "style map" converters:
//! heading and title styles become `<h1>`–`<h6>`, numbered paragraphs
//! become list items, runs keep bold and italic, and tables become plain
//! `<table>` markup. Empty paragraphs are dropped. Cells holding findings
//! carry a `data-finding-id` attribute.

use std::collections::HashMap;

use super::reader::{body, row_cells, run_text, VMerge};
use super::xml::XmlElement;

/// Finding ids by `(table, row, grid column)`
pub type CellIds = HashMap<(usize, usize, usize), String>;

/// Convert a parsed document to HTML
pub fn to_html(document: &XmlElement, ids: &CellIds) -> String {
    let Some(body) = body(document) else {
        return String::new();
    };
    let mut out = Blocks::default();
    let mut table_index = 0;

    for el in body.elements() {
        match el.local() {
            "p" => out.paragraph(el),
            "tbl" => {
                out.table(el, Some(table_index), ids);
                table_index += 1;
            }
            "sdt" => {
                if let Some(content) = el.child("sdtContent") {
                    for inner in content.elements() {
                        match inner.local() {
                            "p" => out.paragraph(inner),
                            "tbl" => out.table(inner, None, ids),
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    out.finish()
}

/// Output buffer that groups consecutive list paragraphs
#[derive(Default)]
struct Blocks {
    html: String,
    in_list: bool,
}

impl Blocks {
    fn close_list(&mut self) {
        if self.in_list {
            self.html.push_str("</ul>");
            self.in_list = false;
        }
    }

    fn paragraph(&mut self, p: &XmlElement) {
        let inner = paragraph_html(p);
        if inner.trim().is_empty() {
            return;
        }

        let ppr = p.child("pPr");
        if ppr.and_then(|pr| pr.child("numPr")).is_some() {
            if !self.in_list {
                self.html.push_str("<ul>");
                self.in_list = true;
            }
            self.html.push_str(&format!("<li>{inner}</li>"));
            return;
        }

        self.close_list();
        let tag = ppr
            .and_then(|pr| pr.child_val("pStyle"))
            .and_then(heading_tag)
            .unwrap_or("p");
        self.html.push_str(&format!("<{tag}>{inner}</{tag}>"));
    }

    fn table(&mut self, tbl: &XmlElement, index: Option<usize>, ids: &CellIds) {
        self.close_list();
        self.html.push_str(&table_html(tbl, index, ids));
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.html
    }
}

/// Tag for a paragraph style id
fn heading_tag(style: &str) -> Option<&'static str> {
    let lower = style.to_lowercase();
    if lower == "title" {
        return Some("h1");
    }
    let level = lower.strip_prefix("heading")?.trim().parse::<u8>().ok()?;
    match level {
        1 => Some("h1"),
        2 => Some("h2"),
        3 => Some("h3"),
        4 => Some("h4"),
        5 => Some("h5"),
        6 => Some("h6"),
        _ => None,
    }
}

/// Whether a toggle property such as `w:b` is on
fn toggle_on(rpr: Option<&XmlElement>, local: &str) -> bool {
    match rpr.and_then(|pr| pr.child(local)) {
        Some(el) => !matches!(el.attr("val"), Some("0") | Some("false") | Some("off")),
        None => false,
    }
}

fn paragraph_html(p: &XmlElement) -> String {
    let mut out = String::new();
    runs_html(p, &mut out);
    out
}

fn runs_html(container: &XmlElement, out: &mut String) {
    for el in container.elements() {
        match el.local() {
            "r" => out.push_str(&run_html(el)),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" => runs_html(el, out),
            _ => {}
        }
    }
}

fn run_html(r: &XmlElement) -> String {
    let mut text = String::new();
    run_text(r, &mut text);
    if text.is_empty() {
        return String::new();
    }

    let mut html = html_escape::encode_text(&text).replace('\n', "<br />");
    let rpr = r.child("rPr");
    if toggle_on(rpr, "i") {
        html = format!("<em>{html}</em>");
    }
    if toggle_on(rpr, "b") {
        html = format!("<strong>{html}</strong>");
    }
    html
}

fn cell_inner_html(tc: &XmlElement, ids: &CellIds) -> String {
    let mut out = String::new();
    for el in tc.elements() {
        match el.local() {
            "p" => {
                let inner = paragraph_html(el);
                if !inner.trim().is_empty() {
                    out.push_str(&format!("<p>{inner}</p>"));
                }
            }
            "tbl" => out.push_str(&table_html(el, None, ids)),
            _ => {}
        }
    }
    out
}

fn table_html(tbl: &XmlElement, index: Option<usize>, ids: &CellIds) -> String {
    let rows: Vec<_> = tbl.children_named("tr").map(|tr| (tr, row_cells(tr))).collect();
    let mut out = String::from("<table>");

    for (r, (tr, cells)) in rows.iter().enumerate() {
        let header = tr.child("trPr").and_then(|pr| pr.child("tblHeader")).is_some();
        let tag = if header { "th" } else { "td" };
        out.push_str("<tr>");

        for (tc, cell) in cells {
            if cell.v_merge == VMerge::Continue {
                continue;
            }

            let mut attrs = String::new();
            if cell.span > 1 {
                attrs.push_str(&format!(" colspan=\"{}\"", cell.span));
            }
            if cell.v_merge == VMerge::Restart {
                let rowspan = 1 + rows[r + 1..]
                    .iter()
                    .take_while(|(_, next)| {
                        next.iter().any(|(_, c)| {
                            c.grid_col == cell.grid_col && c.v_merge == VMerge::Continue
                        })
                    })
                    .count();
                if rowspan > 1 {
                    attrs.push_str(&format!(" rowspan=\"{rowspan}\""));
                }
            }
            if let Some(t) = index {
                let id = (cell.grid_col..cell.grid_col + cell.span)
                    .find_map(|c| ids.get(&(t, r, c)));
                if let Some(id) = id {
                    attrs.push_str(&format!(
                        " data-finding-id=\"{}\"",
                        html_escape::encode_double_quoted_attribute(id)
                    ));
                }
            }

            out.push_str(&format!("<{tag}{attrs}>{}</{tag}>", cell_inner_html(tc, ids)));
        }
        out.push_str("</tr>");
    }

    out.push_str("</table>");
    out
}
