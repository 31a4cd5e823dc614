//! Page reconstruction
//!
//! Merges a page's text blocks and detected tables into one ordered
//! stream of elements, collecting findings on the way. A block belongs
//! to the first table that covers more than half of its area; the first
//! such block renders the whole table and the rest of its blocks render
//! nothing.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::elements::{PageElement, RenderedCell, RenderedTable, TextElement, TextTag};
use super::error::PdfResult;
use super::layout::{Block, LayoutSource, PageLayout, Rect, TableRegion};
use super::reading_order::{ReadingOrder, TopLeftOrder};
use super::style;
use crate::findings::{classify, collapse_whitespace, FindingCollector, FindingId, FindingsMap};

/// Share of a block's area that must lie inside a table
const TABLE_MEMBERSHIP: f32 = 0.5;

/// Tolerance when mapping cell edges onto grid lines
const SPAN_EPSILON: f32 = 0.5;

/// A reconstructed document
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub pages: Vec<Vec<PageElement>>,
    pub findings: FindingsMap,
}

impl Reconstruction {
    /// All pages as HTML, one `div.pdf-page` per page
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for (index, elements) in self.pages.iter().enumerate() {
            html.push_str(&format!("<div class=\"pdf-page\" data-page=\"{index}\">"));
            for element in elements {
                html.push_str(&element.to_html());
            }
            html.push_str("</div>");
        }
        html
    }

    /// Substitute approved text by finding id; unknown ids are ignored
    pub fn apply_approved(&mut self, approved: &HashMap<String, String>) -> usize {
        self.pages
            .iter_mut()
            .flatten()
            .map(|el| el.apply_approved(approved))
            .sum()
    }
}

pub struct PageReconstructor {
    order: Box<dyn ReadingOrder>,
}

impl Default for PageReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageReconstructor {
    pub fn new() -> Self {
        Self {
            order: Box::new(TopLeftOrder),
        }
    }

    pub fn with_order(order: Box<dyn ReadingOrder>) -> Self {
        Self { order }
    }

    /// Reconstruct every page of `source`
    ///
    /// The finding column carries over from page to page so tables split
    /// by a page break keep extracting from the same column.
    pub fn reconstruct<S: LayoutSource + ?Sized>(&self, source: &S) -> PdfResult<Reconstruction> {
        let mut collector = FindingCollector::new();
        let mut inherited: Option<usize> = None;
        let mut pages = Vec::with_capacity(source.page_count());

        for index in 0..source.page_count() {
            let layout = source.page_layout(index)?;
            pages.push(self.reconstruct_page(&layout, &mut inherited, &mut collector));
        }

        Ok(Reconstruction {
            pages,
            findings: collector.into_findings(),
        })
    }

    pub fn reconstruct_page(
        &self,
        page: &PageLayout,
        inherited: &mut Option<usize>,
        collector: &mut FindingCollector,
    ) -> Vec<PageElement> {
        let mut elements = Vec::new();
        let mut rendered_tables: HashSet<usize> = HashSet::new();

        for b in self.order.order(&page.blocks) {
            let block = &page.blocks[b];
            if !block.is_text() {
                continue;
            }

            match owning_table(block, &page.tables) {
                Some(t) => {
                    if rendered_tables.insert(t) {
                        elements.push(PageElement::Table(render_table(
                            page,
                            t,
                            &page.tables[t],
                            inherited,
                            collector,
                        )));
                    }
                }
                None => elements.extend(render_block(page.index, b, block, collector)),
            }
        }

        debug!(
            page = page.index,
            elements = elements.len(),
            tables = rendered_tables.len(),
            "Reconstructed page"
        );
        elements
    }
}

fn owning_table(block: &Block, tables: &[TableRegion]) -> Option<usize> {
    let area = block.bbox.area();
    tables.iter().position(|t| {
        if area > 0.0 {
            block.bbox.intersection_area(&t.bbox) > TABLE_MEMBERSHIP * area
        } else {
            let (cx, cy) = block.bbox.center();
            t.bbox.contains(cx, cy)
        }
    })
}

fn render_block(
    page: usize,
    b: usize,
    block: &Block,
    collector: &mut FindingCollector,
) -> Vec<PageElement> {
    block
        .lines()
        .iter()
        .enumerate()
        .filter_map(|(l, line)| {
            let text = collapse_whitespace(&line.plain_text());
            if text.is_empty() {
                return None;
            }
            let finding_id = collector.offer_line(FindingId::pdf_line(page, b, l), &text);
            Some(PageElement::Text(TextElement {
                tag: TextTag::from_font_size(line.max_font_size()),
                html: style::render_line(line),
                text,
                finding_id,
            }))
        })
        .collect()
}

/// Grid line positions of a table: left edge of every column, top of every row
fn grid_lines(table: &TableRegion) -> (Vec<f32>, Vec<f32>) {
    let mut lefts = vec![f32::MAX; table.column_count()];
    let mut tops = vec![f32::MAX; table.rows.len()];
    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if let Some(cell) = cell {
                lefts[c] = lefts[c].min(cell.bbox.x);
                tops[r] = tops[r].min(cell.bbox.y);
            }
        }
    }
    (lefts, tops)
}

fn span_count(lines: &[f32], start: f32, end: f32) -> usize {
    lines
        .iter()
        .filter(|&&p| p != f32::MAX && p >= start - SPAN_EPSILON && p < end - SPAN_EPSILON)
        .count()
        .max(1)
}

fn render_table(
    page: &PageLayout,
    t: usize,
    table: &TableRegion,
    inherited: &mut Option<usize>,
    collector: &mut FindingCollector,
) -> RenderedTable {
    let classification = classify(&table.text_rows(), *inherited);
    *inherited = classification.inherited_col;

    let (lefts, tops) = grid_lines(table);

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let header_row = classification.is_header && r == 0;
            row.iter()
                .enumerate()
                .filter_map(|(c, cell)| {
                    let cell = cell.as_ref()?;
                    let finding_id = if !header_row && classification.finding_col == Some(c) {
                        collector.offer_cell(FindingId::pdf_cell(page.index, t, r, c), &cell.text)
                    } else {
                        None
                    };
                    Some(RenderedCell {
                        col: c,
                        html: cell_html(page, &cell.bbox, &cell.text),
                        text: cell.text.clone(),
                        finding_id,
                        colspan: span_count(&lefts, cell.bbox.x, cell.bbox.right()),
                        rowspan: span_count(&tops, cell.bbox.y, cell.bbox.bottom()),
                    })
                })
                .collect()
        })
        .collect();

    RenderedTable {
        header: classification.is_header,
        rows,
    }
}

fn cell_html(page: &PageLayout, rect: &Rect, raw: &str) -> String {
    let styled = style::render(page, rect);
    if styled.is_empty() {
        html_escape::encode_text(raw).into_owned()
    } else {
        styled
    }
}
