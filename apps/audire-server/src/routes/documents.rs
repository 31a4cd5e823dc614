//! Document endpoints
//!
//! - `POST /process-document`: upload, render to HTML, extract and refine findings
//! - `POST /export-document`: write approved findings back and publish the file

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::export::{ExportFormat, ExportRequest};
use crate::findings::FindingsMap;
use crate::pipeline::{self, DocumentKind};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub document_id: Uuid,
    pub document_html: String,
    pub findings_map: FindingsMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocumentRequest {
    pub original_filename: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub export_filename: String,
    #[serde(default)]
    pub export_format: ExportFormat,
    #[serde(default)]
    pub approved_findings: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocumentResponse {
    pub download_url: String,
    pub filename: String,
}

// ============================================================================
// Router
// ============================================================================

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/process-document", post(process_document))
        .route("/export-document", post(export_document))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload a .docx or .pdf and return its HTML and refined findings
async fn process_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    let started = Instant::now();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            tracing::debug!(field = ?field.name(), "Ignoring multipart field");
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let kind = DocumentKind::from_filename(&filename)
            .ok_or_else(|| AppError::UnsupportedFormat(filename.clone()))?;

        let data = field.bytes().await?;
        let stored = state.store().save(&filename, &data).await?;

        let extraction = pipeline::run_blocking(state.config().extraction_timeout(), {
            let data = data.to_vec();
            move || pipeline::extract(kind, data)
        })
        .await?;

        let mut findings = extraction.findings;
        if let Err(e) = state.orchestrator().refine_all(&mut findings).await {
            tracing::error!(document_id = %stored.id, error = %e, "Refinement batch failed");
            return Err(e.into());
        }

        tracing::info!(
            document_id = %stored.id,
            filename = %stored.original_filename,
            kind = kind.extension(),
            findings = findings.len(),
            pages = extraction.units,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processed document"
        );

        return Ok(Json(ProcessResponse {
            document_id: stored.id,
            document_html: extraction.html,
            findings_map: findings,
        }));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file'".to_string(),
    ))
}

/// Rebuild a stored upload with the approved findings
async fn export_document(
    State(state): State<AppState>,
    Json(request): Json<ExportDocumentRequest>,
) -> Result<Json<ExportDocumentResponse>> {
    let stored = state
        .store()
        .resolve(request.document_id.as_deref(), &request.original_filename)
        .await?;

    let original_filename = if request.original_filename.trim().is_empty() {
        stored.original_filename.as_str()
    } else {
        request.original_filename.as_str()
    };

    let exported = state
        .exporter()
        .export(ExportRequest {
            source: &stored.path,
            original_filename,
            export_filename: &request.export_filename,
            format: request.export_format,
            approved: &request.approved_findings,
        })
        .await?;

    tracing::info!(
        document_id = %stored.id,
        filename = %exported.filename,
        replaced = exported.replaced,
        "Export ready"
    );

    Ok(Json(ExportDocumentResponse {
        download_url: exported.download_url,
        filename: exported.filename,
    }))
}
