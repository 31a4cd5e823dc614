//! Finding column classification
//!
//! Decides which table column holds findings. Header detection is by
//! content, not by position certainty: a table whose first rows carry
//! none of the header keywords is treated as the continuation of a
//! table split across a page break and inherits the column chosen for
//! the table it continues.

/// Header keywords, matched case-insensitively as substrings
pub const HEADER_KEYWORDS: &[&str] = &["finding", "issue", "observation", "description"];

/// Column used when nothing else resolves and the table is wide enough
const DEFAULT_FINDING_COLUMN: usize = 1;

/// Outcome of classifying one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Column holding findings, `None` disables extraction for the table
    pub finding_col: Option<usize>,
    /// Whether row 0 is a header row (excluded from extraction)
    pub is_header: bool,
    /// Column to hand to the next table on a following page
    pub inherited_col: Option<usize>,
}

/// Whether `text` contains any header keyword
pub fn contains_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    HEADER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// First cell (in column order) whose text contains a header keyword
pub fn header_keyword_column<S: AsRef<str>>(cells: &[Option<S>]) -> Option<usize> {
    cells.iter().position(|cell| {
        cell.as_ref()
            .map(|text| contains_keyword(text.as_ref()))
            .unwrap_or(false)
    })
}

fn row_matches<S: AsRef<str>>(row: &[Option<S>]) -> bool {
    let joined: String = row
        .iter()
        .flatten()
        .map(|cell| cell.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    contains_keyword(&joined)
}

/// Classify a table given its rows and the column inherited from the
/// previous table, if any
pub fn classify<S: AsRef<str>>(rows: &[Vec<Option<S>>], inherited: Option<usize>) -> Classification {
    let Some(first) = rows.first() else {
        return Classification {
            finding_col: None,
            is_header: false,
            inherited_col: inherited,
        };
    };

    let is_header = row_matches(first) || rows.get(1).map(|r| row_matches(r)).unwrap_or(false);
    let column_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let header_col = if is_header {
        header_keyword_column(first)
    } else {
        None
    };

    let finding_col = header_col
        .or(if is_header { None } else { inherited })
        .or(if column_count > 1 {
            Some(DEFAULT_FINDING_COLUMN)
        } else {
            None
        });

    let inherited_col = if is_header { finding_col } else { inherited };

    Classification {
        finding_col,
        is_header,
        inherited_col,
    }
}
