//! Office document conversion
//!
//! DOCX → PDF conversion is delegated to an external office suite. The
//! converter is a capability behind a trait so the exporter can run
//! without LibreOffice installed (tests inject a fake).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Conversion errors
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The converter binary could not be started
    #[error("Converter unavailable: {0}")]
    Unavailable(String),

    /// The converter did not finish in time and was killed
    #[error("Conversion timed out after {0} seconds")]
    Timeout(u64),

    /// The converter ran but produced no usable output
    #[error("Conversion failed: {0}")]
    Failed(String),
}

/// DOCX to PDF conversion capability
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Convert `docx` into a PDF inside `out_dir`, returning the PDF path
    async fn docx_to_pdf(&self, docx: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// LibreOffice in headless mode
pub struct SofficeConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

/// Where LibreOffice writes the converted file
fn converted_path(docx: &Path, out_dir: &Path) -> PathBuf {
    let stem = docx
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{}.pdf", stem))
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    fn name(&self) -> &'static str {
        "soffice"
    }

    async fn docx_to_pdf(&self, docx: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError> {
        let child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(docx)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConversionError::Unavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        // Dropping the pending future on expiry drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| ConversionError::Failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(status = %output.status, stderr = %stderr, "soffice exited with an error");
            return Err(ConversionError::Failed(format!(
                "soffice exited with {}",
                output.status
            )));
        }

        let pdf = converted_path(docx, out_dir);
        if tokio::fs::metadata(&pdf).await.is_err() {
            return Err(ConversionError::Failed(format!(
                "expected output {} was not produced",
                pdf.display()
            )));
        }

        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_path_uses_docx_stem() {
        let path = converted_path(Path::new("/tmp/x/refined_report.docx"), Path::new("/out"));
        assert_eq!(path, PathBuf::from("/out/refined_report.pdf"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let converter = SofficeConverter::new(
            dir.path().join("no-such-soffice"),
            Duration::from_secs(5),
        );
        let err = converter
            .docx_to_pdf(&dir.path().join("a.docx"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = SofficeConverter::new("false", Duration::from_secs(5));
        let err = converter
            .docx_to_pdf(&dir.path().join("a.docx"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Failed(_)));
    }
}
