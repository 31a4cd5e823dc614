//! Format dispatch
//!
//! Chooses the DOCX or PDF pipeline from the file extension and runs the
//! CPU-bound work on the blocking pool under a time budget.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::docx::{self, DocxError};
use crate::findings::FindingsMap;
use crate::pdf::{self, PdfError};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Detect the format from a file name's extension
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Docx(#[from] DocxError),

    #[error("Document processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Processing task failed: {0}")]
    Task(String),
}

/// HTML rendering plus the findings found while producing it
#[derive(Debug)]
pub struct Extraction {
    pub html: String,
    pub findings: FindingsMap,
    /// Pages for PDFs, top-level tables for DOCX
    pub units: usize,
}

/// Render a document and collect its findings
pub fn extract(kind: DocumentKind, data: Vec<u8>) -> Result<Extraction, PipelineError> {
    match kind {
        DocumentKind::Docx => {
            let extraction = docx::extract(&data)?;
            Ok(Extraction {
                html: extraction.html,
                findings: extraction.findings,
                units: extraction.tables,
            })
        }
        DocumentKind::Pdf => {
            let reconstruction = pdf::reconstruct_bytes(data)?;
            Ok(Extraction {
                html: reconstruction.to_html(),
                units: reconstruction.pages.len(),
                findings: reconstruction.findings,
            })
        }
    }
}

/// Produce a DOCX with the approved findings written in
///
/// DOCX sources are patched in place. PDF sources are reconstructed again,
/// which yields the same ids, and the reconstruction is written as a new
/// DOCX. Returns the package and the number of replaced findings.
pub fn rebuild(
    kind: DocumentKind,
    data: Vec<u8>,
    approved: &HashMap<String, String>,
) -> Result<(Vec<u8>, usize), PipelineError> {
    match kind {
        DocumentKind::Docx => Ok(docx::reinject(&data, approved)?),
        DocumentKind::Pdf => {
            let mut reconstruction = pdf::reconstruct_bytes(data)?;
            let replaced = reconstruction.apply_approved(approved);
            let package = docx::write_elements(&reconstruction.pages)?;
            Ok((package, replaced))
        }
    }
}

/// Run CPU-bound work on the blocking pool, bounded by `limit`
pub async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    let started = Instant::now();
    let result = timeout(limit, tokio::task::spawn_blocking(work)).await;

    match result {
        Ok(join_result) => join_result.map_err(|e| PipelineError::Task(e.to_string()))?,
        Err(_) => {
            tracing::error!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Document processing exceeded its time budget"
            );
            Err(PipelineError::Timeout(limit.as_secs()))
        }
    }
}
