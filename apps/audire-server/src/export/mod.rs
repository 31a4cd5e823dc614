//! Export of reviewed documents
//!
//! Writes the approved findings back into the stored upload, saves the
//! result as `{base}.docx` in the export directory and, when asked for a
//! PDF, hands it to the office converter. A failed conversion is not an
//! error: the caller simply gets the DOCX.

mod convert;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::pipeline::{self, DocumentKind, PipelineError};

pub use convert::{ConversionError, DocumentConverter, SofficeConverter};

/// Requested export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Docx,
    Pdf,
}

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unsupported source document: {0}")]
    UnsupportedSource(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to export
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    /// Stored upload to rebuild from
    pub source: &'a Path,
    /// Name the document was uploaded under
    pub original_filename: &'a str,
    /// Caller-chosen base name; empty selects the default
    pub export_filename: &'a str,
    pub format: ExportFormat,
    pub approved: &'a HashMap<String, String>,
}

/// A written export artifact
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub filename: String,
    pub download_url: String,
    /// Findings actually written into the document
    pub replaced: usize,
}

/// Base name of the export: the caller's choice or `refined_{stem}`
pub fn export_base_name(original_filename: &str, export_filename: &str) -> String {
    let requested = export_filename.trim();
    if !requested.is_empty() {
        return sanitize_base(requested);
    }

    let lower = original_filename.to_lowercase();
    let stem = if lower.ends_with(".docx") {
        &original_filename[..original_filename.len() - 5]
    } else if lower.ends_with(".pdf") {
        &original_filename[..original_filename.len() - 4]
    } else {
        original_filename
    };
    format!("refined_{}", sanitize_base(stem))
}

/// Keep a caller-supplied name inside the export directory
fn sanitize_base(name: &str) -> String {
    let leaf = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let leaf = leaf
        .strip_suffix(".docx")
        .or_else(|| leaf.strip_suffix(".pdf"))
        .unwrap_or(leaf);
    let cleaned: String = leaf
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim_start_matches('.')
        .to_string();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// Rebuilds reviewed documents into the export directory
pub struct Exporter {
    export_dir: PathBuf,
    public_base_url: String,
    converter: Arc<dyn DocumentConverter>,
    processing_timeout: Duration,
}

impl Exporter {
    pub fn new(
        export_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        converter: Arc<dyn DocumentConverter>,
        processing_timeout: Duration,
    ) -> Self {
        Self {
            export_dir: export_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            converter,
            processing_timeout,
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Public URL of an exported file
    pub fn download_url(&self, filename: &str) -> String {
        format!(
            "{}/exports/{}",
            self.public_base_url,
            urlencoding::encode(filename)
        )
    }

    /// Rebuild the source with the approved findings and write the artifact
    pub async fn export(&self, request: ExportRequest<'_>) -> Result<ExportedFile, ExportError> {
        let started = Instant::now();
        // The stored file decides the format; the caller's name may disagree
        let kind = request
            .source
            .to_str()
            .and_then(DocumentKind::from_filename)
            .or_else(|| DocumentKind::from_filename(request.original_filename))
            .ok_or_else(|| ExportError::UnsupportedSource(request.original_filename.to_string()))?;

        let data = tokio::fs::read(request.source).await?;
        let approved = request.approved.clone();
        let (package, replaced) = pipeline::run_blocking(self.processing_timeout, move || {
            pipeline::rebuild(kind, data, &approved)
        })
        .await?;

        tokio::fs::create_dir_all(&self.export_dir).await?;
        let base = export_base_name(request.original_filename, request.export_filename);
        let docx_path = self.export_dir.join(format!("{}.docx", base));
        tokio::fs::write(&docx_path, &package).await?;

        let path = match request.format {
            ExportFormat::Docx => docx_path,
            ExportFormat::Pdf => match self
                .converter
                .docx_to_pdf(&docx_path, &self.export_dir)
                .await
            {
                Ok(pdf) => pdf,
                Err(e) => {
                    tracing::warn!(
                        converter = self.converter.name(),
                        error = %e,
                        "PDF conversion failed, returning DOCX"
                    );
                    docx_path
                }
            },
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.docx", base));

        tracing::info!(
            filename = %filename,
            replaced,
            approved = request.approved.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Exported document"
        );

        Ok(ExportedFile {
            download_url: self.download_url(&filename),
            filename,
            path,
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{build_docx, table};
    use async_trait::async_trait;

    /// Writes a placeholder PDF next to the DOCX
    struct FakeConverter;

    #[async_trait]
    impl DocumentConverter for FakeConverter {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn docx_to_pdf(
            &self,
            docx: &Path,
            out_dir: &Path,
        ) -> Result<PathBuf, ConversionError> {
            let stem = docx.file_stem().unwrap().to_string_lossy().into_owned();
            let pdf = out_dir.join(format!("{}.pdf", stem));
            tokio::fs::write(&pdf, b"%PDF-1.4\n").await.unwrap();
            Ok(pdf)
        }
    }

    struct BrokenConverter;

    #[async_trait]
    impl DocumentConverter for BrokenConverter {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn docx_to_pdf(&self, _: &Path, _: &Path) -> Result<PathBuf, ConversionError> {
            Err(ConversionError::Timeout(30))
        }
    }

    fn exporter(dir: &Path, converter: Arc<dyn DocumentConverter>) -> Exporter {
        Exporter::new(
            dir.join("exports"),
            "http://localhost:8000/",
            converter,
            Duration::from_secs(10),
        )
    }

    fn source(dir: &Path) -> PathBuf {
        let path = dir.join("abc_audit report.docx");
        std::fs::write(
            &path,
            build_docx(&table(&[
                &["#", "Finding", "Owner"],
                &["1", "Password stored in plaintext", "Bob"],
            ])),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_base_name_defaults() {
        assert_eq!(export_base_name("audit.docx", ""), "refined_audit");
        assert_eq!(export_base_name("Audit.PDF", "  "), "refined_Audit");
        assert_eq!(export_base_name("audit.docx", "final"), "final");
        assert_eq!(export_base_name("audit.docx", "../../etc/final.docx"), "final");
    }

    #[tokio::test]
    async fn test_export_docx_writes_approved_text() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let approved = HashMap::from([(
            "table_0_row_1_col_1".to_string(),
            "Credentials are hashed and salted.".to_string(),
        )]);

        let file = exporter(dir.path(), Arc::new(FakeConverter))
            .export(ExportRequest {
                source: &src,
                original_filename: "audit report.docx",
                export_filename: "",
                format: ExportFormat::Docx,
                approved: &approved,
            })
            .await
            .unwrap();

        assert_eq!(file.filename, "refined_audit report.docx");
        assert_eq!(
            file.download_url,
            "http://localhost:8000/exports/refined_audit%20report.docx"
        );
        assert_eq!(file.replaced, 1);

        let written = std::fs::read(&file.path).unwrap();
        let extraction = crate::docx::extract(&written).unwrap();
        assert_eq!(
            extraction.findings["table_0_row_1_col_1"].original,
            "Credentials are hashed and salted."
        );
    }

    #[tokio::test]
    async fn test_export_pdf_uses_converter() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let approved = HashMap::new();

        let file = exporter(dir.path(), Arc::new(FakeConverter))
            .export(ExportRequest {
                source: &src,
                original_filename: "audit report.docx",
                export_filename: "final",
                format: ExportFormat::Pdf,
                approved: &approved,
            })
            .await
            .unwrap();

        assert_eq!(file.filename, "final.pdf");
        assert!(file.path.exists());
    }

    #[tokio::test]
    async fn test_conversion_failure_falls_back_to_docx() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let approved = HashMap::new();

        let file = exporter(dir.path(), Arc::new(BrokenConverter))
            .export(ExportRequest {
                source: &src,
                original_filename: "audit report.docx",
                export_filename: "",
                format: ExportFormat::Pdf,
                approved: &approved,
            })
            .await
            .unwrap();

        assert_eq!(file.filename, "refined_audit report.docx");
        assert!(file.path.exists());
    }

    #[tokio::test]
    async fn test_unsupported_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let approved = HashMap::new();

        let err = exporter(dir.path(), Arc::new(FakeConverter))
            .export(ExportRequest {
                source: &path,
                original_filename: "notes.txt",
                export_filename: "",
                format: ExportFormat::Docx,
                approved: &approved,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedSource(_)));
    }

    #[tokio::test]
    async fn test_stored_file_decides_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = source(dir.path());
        let approved = HashMap::from([(
            "table_0_row_1_col_1".to_string(),
            "Credentials are hashed and salted.".to_string(),
        )]);

        let file = exporter(dir.path(), Arc::new(FakeConverter))
            .export(ExportRequest {
                source: &path,
                original_filename: "audit report.pdf",
                export_filename: "",
                format: ExportFormat::Docx,
                approved: &approved,
            })
            .await
            .unwrap();

        assert_eq!(file.filename, "refined_audit report.docx");
        assert_eq!(file.replaced, 1);
    }
}
