//! PDF ingestion pipeline
//!
//! Turns a PDF into reviewable HTML plus a findings map without keeping
//! any document model around between requests:
//!
//! - `source`: page layouts from MuPDF, with rulings and font styles
//!   recovered from the content stream (`content`)
//! - `grid`: ruled-table detection
//! - `style`: styled HTML for an arbitrary page rectangle
//! - `reconstruct`: ordered page elements, tables substituted whole,
//!   findings collected on the way

mod content;
mod elements;
mod error;
mod grid;
mod layout;
mod reading_order;
mod reconstruct;
mod source;
pub mod style;

#[cfg(test)]
pub(crate) mod testing;

pub use content::{style_from_name, ContentScanner, PageGraphics, StyleMark};
pub use elements::{PageElement, RenderedCell, RenderedTable, TextElement, TextTag};
pub use error::{PdfError, PdfResult};
pub use grid::{find_tables, Glyph, GridSettings, Ruling};
pub use layout::{Block, BlockKind, LayoutSource, Line, PageLayout, Rect, Span, TableCell, TableRegion};
pub use reading_order::{ReadingOrder, TopLeftOrder};
pub use reconstruct::{PageReconstructor, Reconstruction};
pub use source::MupdfSource;

/// Reconstruct a PDF from its bytes with the default reading order
pub fn reconstruct_bytes(data: Vec<u8>) -> PdfResult<Reconstruction> {
    let source = MupdfSource::open(data)?;
    PageReconstructor::new().reconstruct(&source)
}
