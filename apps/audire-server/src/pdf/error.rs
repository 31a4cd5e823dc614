//! PDF pipeline errors

use thiserror::Error;

/// Errors raised while reading or reconstructing a PDF
#[derive(Debug, Error)]
pub enum PdfError {
    /// The bytes are not a PDF the layout engine can open
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Page {0} not found (document has {1} pages)")]
    PageNotFound(usize, usize),

    /// MuPDF reported an error while walking a page
    #[error("MuPDF error: {0}")]
    MuPdf(String),

    /// Content stream could not be decoded
    #[error("Content stream error on page {page}: {message}")]
    Content { page: usize, message: String },
}

pub type PdfResult<T> = std::result::Result<T, PdfError>;

impl From<mupdf::Error> for PdfError {
    fn from(e: mupdf::Error) -> Self {
        PdfError::MuPdf(e.to_string())
    }
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Load(e.to_string())
    }
}
