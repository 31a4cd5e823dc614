//! Finding identifiers
//!
//! Identifiers are pure functions of a cell's (or line's) position in
//! the document structure. Re-opening the same document and walking it
//! again reproduces the same ids, which is what export reinjection
//! relies on: no cross-reference is stored between requests.
//!
//! ```text
//! table_{t}_row_{r}_col_{c}            DOCX table cell
//! page_{p}_table_{t}_row_{r}_col_{c}   PDF table cell
//! page_{p}_block_{b}_line_{l}          PDF standalone line
//! ```

use std::fmt;
use std::str::FromStr;

/// Structured form of a finding id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingId {
    /// DOCX table cell (0-based table, row 0 is the header, 0-based grid column)
    DocxCell { table: usize, row: usize, col: usize },
    /// PDF table cell (0-based page and per-page table index)
    PdfCell {
        page: usize,
        table: usize,
        row: usize,
        col: usize,
    },
    /// PDF line outside any table (block index in reading order)
    PdfLine { page: usize, block: usize, line: usize },
}

impl FindingId {
    pub fn docx_cell(table: usize, row: usize, col: usize) -> Self {
        Self::DocxCell { table, row, col }
    }

    pub fn pdf_cell(page: usize, table: usize, row: usize, col: usize) -> Self {
        Self::PdfCell {
            page,
            table,
            row,
            col,
        }
    }

    pub fn pdf_line(page: usize, block: usize, line: usize) -> Self {
        Self::PdfLine { page, block, line }
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocxCell { table, row, col } => {
                write!(f, "table_{}_row_{}_col_{}", table, row, col)
            }
            Self::PdfCell {
                page,
                table,
                row,
                col,
            } => write!(f, "page_{}_table_{}_row_{}_col_{}", page, table, row, col),
            Self::PdfLine { page, block, line } => {
                write!(f, "page_{}_block_{}_line_{}", page, block, line)
            }
        }
    }
}

/// Error returned for strings that are not finding ids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed finding id: {0}")]
pub struct ParseFindingIdError(String);

impl FromStr for FindingId {
    type Err = ParseFindingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFindingIdError(s.to_string());
        let parts: Vec<&str> = s.split('_').collect();

        // Alternating key/value pairs
        if parts.len() % 2 != 0 {
            return Err(err());
        }
        let mut pairs = Vec::with_capacity(parts.len() / 2);
        for pair in parts.chunks(2) {
            let value: usize = pair[1].parse().map_err(|_| err())?;
            pairs.push((pair[0], value));
        }

        match pairs.as_slice() {
            [("table", table), ("row", row), ("col", col)] => {
                Ok(Self::docx_cell(*table, *row, *col))
            }
            [("page", page), ("table", table), ("row", row), ("col", col)] => {
                Ok(Self::pdf_cell(*page, *table, *row, *col))
            }
            [("page", page), ("block", block), ("line", line)] => {
                Ok(Self::pdf_line(*page, *block, *line))
            }
            _ => Err(err()),
        }
    }
}
