//! Storage types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An upload copied into the temp area
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub original_filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredDocument {
    /// On-disk name: `{id}_{filename}`
    pub fn stored_name(id: Uuid, filename: &str) -> String {
        format!("{}_{}", id, filename)
    }

    /// Split a stored name back into id and original filename
    pub fn parse_stored_name(name: &str) -> Option<(Uuid, &str)> {
        let (id, filename) = name.split_once('_')?;
        let id = Uuid::parse_str(id).ok()?;
        (!filename.is_empty()).then_some((id, filename))
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_parses_back() {
        let id = Uuid::new_v4();
        let name = StoredDocument::stored_name(id, "audit_2024 final.docx");
        assert_eq!(
            StoredDocument::parse_stored_name(&name),
            Some((id, "audit_2024 final.docx"))
        );
        assert_eq!(StoredDocument::parse_stored_name("report.docx"), None);
        assert_eq!(StoredDocument::parse_stored_name("nope_report.docx"), None);
    }
}
