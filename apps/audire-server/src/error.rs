//! Error types for the Audire server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::docx::DocxError;
use crate::export::{ConversionError, ExportError};
use crate::findings::RefineError;
use crate::pdf::PdfError;
use crate::pipeline::PipelineError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Refinement error: {0}")]
    Refine(#[from] RefineError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        AppError::InvalidDocument(err.to_string())
    }
}

impl From<DocxError> for AppError {
    fn from(err: DocxError) -> Self {
        match err {
            DocxError::Io(e) => AppError::Io(e),
            other => AppError::InvalidDocument(other.to_string()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Pdf(e) => e.into(),
            PipelineError::Docx(e) => e.into(),
            PipelineError::Timeout(secs) => AppError::Timeout(secs),
            PipelineError::Task(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedSource(name) => AppError::UnsupportedFormat(name),
            ExportError::Pipeline(e) => e.into(),
            ExportError::Io(e) => AppError::Io(e),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::UnsupportedFormat(name) => (
                StatusCode::BAD_REQUEST,
                "unsupported_format",
                format!("Unsupported file type: {}. Upload a .docx or .pdf file", name),
            ),
            AppError::Multipart(e) => (StatusCode::BAD_REQUEST, "bad_request", e.body_text()),
            AppError::InvalidDocument(msg) => {
                tracing::warn!("Invalid document: {}", msg);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_document",
                    "The document could not be read".to_string(),
                )
            }
            AppError::Timeout(secs) => {
                tracing::error!("Processing timed out after {}s", secs);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "timeout",
                    format!("Processing timed out after {} seconds", secs),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Storage(e) => match e {
                StorageError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("No uploaded document matches {}; upload it again", what),
                ),
                StorageError::InvalidFilename(name) => (
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("Invalid filename: {}", name),
                ),
                StorageError::Io(io) => {
                    tracing::error!("Storage error: {}", io);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    )
                }
            },
            AppError::Refine(e) => {
                tracing::error!("Refinement error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "refinement_error",
                    e.to_string(),
                )
            }
            AppError::Conversion(e) => {
                tracing::error!("Conversion error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "conversion_error",
                    "Document conversion failed".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::UnsupportedFormat("a.txt".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Storage(StorageError::NotFound("audit.docx".into())),
                StatusCode::NOT_FOUND,
            ),
            (AppError::from(PdfError::Load("bad".into())), StatusCode::UNPROCESSABLE_ENTITY),
            (
                AppError::from(PipelineError::Timeout(120)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_docx_io_is_not_invalid_document() {
        let err = AppError::from(DocxError::Io(std::io::Error::other("disk")));
        assert!(matches!(err, AppError::Io(_)));
    }
}
