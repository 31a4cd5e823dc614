//! MuPDF-backed layout source
//!
//! MuPDF documents are not thread-safe. `MupdfSource` keeps the raw bytes
//! and opens a fresh document for every page request, serialized behind
//! a mutex. Font styles and ruling lines come from the lopdf content
//! scanner; a page whose content stream cannot be read still yields its
//! text, just without tables or styles.

use std::sync::Arc;

use mupdf::{Document, TextPageOptions};
use parking_lot::Mutex;
use tracing::warn;

use super::content::{ContentScanner, PageGraphics};
use super::error::{PdfError, PdfResult};
use super::grid::{find_tables, Glyph, GridSettings};
use super::layout::{Block, LayoutSource, Line, PageLayout, Rect, Span};

const PDF_MIME: &str = "application/pdf";

/// Font sizes closer than this share a span
const SIZE_EPSILON: f32 = 0.1;

pub struct MupdfSource {
    data: Arc<Vec<u8>>,
    page_count: usize,
    scanner: Option<ContentScanner>,
    grid: GridSettings,
    _lock: Mutex<()>,
}

// SAFETY: no MuPDF handle outlives a call. Every operation opens its own
// document under `_lock` and drops it before returning; the remaining
// fields are owned data.
unsafe impl Send for MupdfSource {}
unsafe impl Sync for MupdfSource {}

impl MupdfSource {
    /// Validate the bytes as a PDF and prepare page access
    pub fn open(data: Vec<u8>) -> PdfResult<Self> {
        let doc = Document::from_bytes(&data, PDF_MIME).map_err(|e| PdfError::Load(e.to_string()))?;
        let page_count = doc.page_count()? as usize;
        drop(doc);

        let scanner = match ContentScanner::load(&data) {
            Ok(scanner) if scanner.page_count() == page_count => Some(scanner),
            Ok(scanner) => {
                warn!(
                    mupdf_pages = page_count,
                    lopdf_pages = scanner.page_count(),
                    "Page tree mismatch, tables and styles disabled"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Content scanner unavailable, tables and styles disabled");
                None
            }
        };

        Ok(Self {
            data: Arc::new(data),
            page_count,
            scanner,
            grid: GridSettings::default(),
            _lock: Mutex::new(()),
        })
    }

    fn graphics(&self, index: usize) -> PageGraphics {
        let Some(scanner) = &self.scanner else {
            return PageGraphics::default();
        };
        scanner.scan_page(index).unwrap_or_else(|e| {
            warn!(page = index, error = %e, "Skipping content scan");
            PageGraphics::default()
        })
    }
}

impl LayoutSource for MupdfSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_layout(&self, index: usize) -> PdfResult<PageLayout> {
        if index >= self.page_count {
            return Err(PdfError::PageNotFound(index, self.page_count));
        }

        let graphics = self.graphics(index);

        let _guard = self._lock.lock();
        let doc = Document::from_bytes(&self.data, PDF_MIME)?;
        let page = doc.load_page(index as i32)?;
        let bounds = page.bounds()?;
        let text_page = page.to_text_page(TextPageOptions::empty())?;

        let mut blocks = Vec::new();
        let mut glyphs = Vec::new();
        let mut line_no = 0usize;

        for block in text_page.blocks() {
            let mut lines = Vec::new();

            for line in block.lines() {
                let mut spans: Vec<Span> = Vec::new();

                for ch in line.chars() {
                    let Some(c) = ch.char() else { continue };
                    let quad = ch.quad();
                    let x = quad.ul.x.min(quad.ll.x);
                    let y = quad.ul.y.min(quad.ur.y);
                    let right = quad.ur.x.max(quad.lr.x);
                    let bottom = quad.ll.y.max(quad.lr.y);
                    let bbox = Rect::from_ltrb(x, y, right.max(x), bottom.max(y));
                    let size = ch.size();
                    let (bold, italic) = graphics.style_at(x, y, bottom);

                    glyphs.push(Glyph { ch: c, bbox, line: line_no });

                    match spans.last_mut() {
                        Some(span)
                            if (span.size - size).abs() < SIZE_EPSILON
                                && span.bold == bold
                                && span.italic == italic =>
                        {
                            span.text.push(c);
                            span.chars.push(bbox);
                            span.bbox = span.bbox.union(&bbox);
                        }
                        _ => spans.push(Span {
                            text: c.to_string(),
                            bbox,
                            size,
                            bold,
                            italic,
                            chars: vec![bbox],
                        }),
                    }
                }

                let lb = line.bounds();
                lines.push(Line {
                    bbox: Rect::from_ltrb(lb.x0, lb.y0, lb.x1, lb.y1),
                    spans,
                });
                line_no += 1;
            }

            let bb = block.bounds();
            blocks.push(Block::text(Rect::from_ltrb(bb.x0, bb.y0, bb.x1, bb.y1), lines));
        }

        let tables = find_tables(&graphics.rulings, &glyphs, &self.grid);

        Ok(PageLayout {
            index,
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
            blocks,
            tables,
        })
    }
}
