//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use audire_server::app;
use audire_server::config::Config;
use audire_server::docx::package_from_body;
use audire_server::export::{ConversionError, DocumentConverter};
use audire_server::findings::{RefineError, Refiner, StubRefiner};
use audire_server::state::AppState;

/// Converter that always reports a missing office suite
pub struct NoOffice;

#[async_trait]
impl DocumentConverter for NoOffice {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn docx_to_pdf(&self, _: &Path, _: &Path) -> Result<PathBuf, ConversionError> {
        Err(ConversionError::Unavailable("not installed".into()))
    }
}

/// A server over fresh temp/export directories
pub struct Harness {
    pub server: TestServer,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn exports(&self) -> PathBuf {
        self.dir.path().join("exports")
    }
}

/// Refiner that fails on any text containing `trigger`
pub struct FailingRefiner {
    pub trigger: &'static str,
}

#[async_trait]
impl Refiner for FailingRefiner {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn refine(&self, original: &str) -> Result<String, RefineError> {
        if original.contains(self.trigger) {
            return Err(RefineError::Transform("model unavailable".into()));
        }
        Ok(original.to_uppercase())
    }
}

pub fn harness() -> Harness {
    harness_with(Arc::new(StubRefiner::new(Duration::ZERO)))
}

pub fn harness_with(refiner: Arc<dyn Refiner>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.temp_dir = dir.path().join("temp");
    config.export.export_dir = dir.path().join("exports");
    config.export.public_base_url = "http://testserver".to_string();
    config.processing.refine_latency_ms = 0;

    let prompts = BTreeMap::from([(
        "refine.md".to_string(),
        "Rewrite the finding.".to_string(),
    )]);
    let state = AppState::with_parts(
        config,
        refiner,
        Arc::new(NoOffice),
        prompts,
    );

    Harness {
        server: TestServer::new(app::router(state)).unwrap(),
        dir,
    }
}

/// A plain DOCX table, one paragraph per cell
pub fn docx_table(rows: &[&[&str]]) -> String {
    let mut out = String::from("<w:tbl>");
    for row in rows {
        out.push_str("<w:tr>");
        for text in *row {
            out.push_str(&format!(
                "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                text
            ));
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    out
}

pub fn findings_docx() -> Vec<u8> {
    let body = format!(
        "<w:p><w:r><w:t>Audit report</w:t></w:r></w:p>{}",
        docx_table(&[
            &["#", "Finding", "Owner"],
            &["1", "Password stored in plaintext", "Bob"],
        ])
    );
    package_from_body(&body).unwrap()
}

/// Single-page A4 PDF with Helvetica lines at the given positions
pub fn text_pdf(lines: &[(i64, i64, &str)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font },
    });

    let mut operations = Vec::new();
    for (x, y, s) in lines {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 11.into()]),
            Operation::new("Td", vec![(*x).into(), (*y).into()]),
            Operation::new("Tj", vec![Object::string_literal(*s)]),
            Operation::new("ET", vec![]),
        ]);
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
