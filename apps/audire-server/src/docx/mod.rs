//! DOCX pipeline
//!
//! Reads `word/document.xml` straight out of the package, converts it to
//! HTML, extracts findings from keyword-headed tables and writes approved
//! text back cell by cell. A minimal writer turns reconstructed PDFs into
//! DOCX for export.

mod error;
mod findings;
mod html;
mod package;
mod reader;
mod writer;
mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DocxError, DocxResult};
pub use findings::{extract, finding_column, reinject, DocxExtraction};
pub use html::{to_html, CellIds};
pub use package::{read_part, replace_part, write_package, DOCUMENT_PART};
pub use reader::{read_tables, DocxCell, DocxRow, DocxTable, VMerge};
pub use writer::{package_from_body, write_elements};
pub use xml::{parse, XmlElement, XmlNode};
