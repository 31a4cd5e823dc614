//! DOCX fixtures for tests

use super::writer::package_from_body;

/// `word/document.xml` with the given body markup
pub fn document_xml(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        body
    )
}

/// A plain table, one paragraph per cell
pub fn table(rows: &[&[&str]]) -> String {
    let mut out = String::from("<w:tbl>");
    for row in rows {
        out.push_str("<w:tr>");
        for text in *row {
            if text.is_empty() {
                out.push_str("<w:tc><w:p/></w:tc>");
            } else {
                out.push_str(&format!("<w:tc><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"));
            }
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    out
}

/// Complete DOCX package around `body`
pub fn build_docx(body: &str) -> Vec<u8> {
    package_from_body(body).expect("build docx")
}
