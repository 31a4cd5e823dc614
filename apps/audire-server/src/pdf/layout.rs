//! PDF page layout model
//!
//! The layout primitive's output for one page: positioned text blocks
//! (lines of styled spans) plus the table regions detected on the page.
//! All coordinates are in points with the origin at the top-left corner
//! of the page, y growing downwards.

use serde::{Deserialize, Serialize};

use super::error::PdfResult;

/// Rectangle (bounding box)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Overlapping area of two rectangles (0 when disjoint)
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expand(&self, margin: f32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_ltrb(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// A run of text sharing one font size and style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bbox: Rect,
    /// Font size in points
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    /// Per-character boxes, parallel to `text.chars()`
    #[serde(skip)]
    pub chars: Vec<Rect>,
}

impl Span {
    /// The part of the span whose character centers fall inside `clip`
    ///
    /// Spans without character boxes are kept whole when their box
    /// intersects `clip`.
    pub fn clip(&self, clip: &Rect) -> Option<Span> {
        if !self.bbox.intersects(clip) {
            return None;
        }
        if self.chars.is_empty() {
            return Some(self.clone());
        }

        let mut text = String::new();
        let mut chars = Vec::new();
        let mut bbox: Option<Rect> = None;
        for (c, r) in self.text.chars().zip(&self.chars) {
            let (cx, cy) = r.center();
            if clip.contains(cx, cy) {
                text.push(c);
                chars.push(*r);
                bbox = Some(bbox.map_or(*r, |b| b.union(r)));
            }
        }

        bbox.map(|bbox| Span {
            text,
            bbox,
            size: self.size,
            bold: self.bold,
            italic: self.italic,
            chars,
        })
    }
}

/// A line of spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub bbox: Rect,
    pub spans: Vec<Span>,
}

impl Line {
    /// Plain text: non-blank spans joined by single spaces
    pub fn plain_text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Largest font size on the line
    pub fn max_font_size(&self) -> f32 {
        self.spans.iter().map(|s| s.size).fold(0.0, f32::max)
    }
}

/// Block content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "lines", rename_all = "lowercase")]
pub enum BlockKind {
    Text(Vec<Line>),
    /// Images carry no text and are skipped during reconstruction
    Image,
}

/// Page layout block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub bbox: Rect,
    pub kind: BlockKind,
}

impl Block {
    pub fn text(bbox: Rect, lines: Vec<Line>) -> Self {
        Self {
            bbox,
            kind: BlockKind::Text(lines),
        }
    }

    pub fn lines(&self) -> &[Line] {
        match &self.kind {
            BlockKind::Text(lines) => lines,
            BlockKind::Image => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, BlockKind::Text(_))
    }
}

/// One cell of a detected table grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub bbox: Rect,
    /// Plain text extracted from the cell area
    pub text: String,
}

/// A table detected on a page
///
/// `rows[r][c]` is `None` where the grid position is covered by a
/// neighbouring spanning cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub bbox: Rect,
    pub rows: Vec<Vec<Option<TableCell>>>,
}

impl TableRegion {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Rows as optional plain strings (classifier input)
    pub fn text_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(|c| c.text.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Layout of one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Block>,
    pub tables: Vec<TableRegion>,
}

/// Source of page layouts for one document
///
/// Implementations are synchronous and CPU-bound; callers run them on
/// the blocking pool.
pub trait LayoutSource {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Layout of the page at `index` (0-based)
    fn page_layout(&self, index: usize) -> PdfResult<PageLayout>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 25.0);
        assert_eq!(a.intersection_area(&Rect::new(20.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_expand_and_union() {
        let r = Rect::new(10.0, 10.0, 5.0, 5.0).expand(1.0);
        assert_eq!(r, Rect::new(9.0, 9.0, 7.0, 7.0));

        let u = Rect::new(0.0, 0.0, 1.0, 1.0).union(&Rect::new(4.0, 2.0, 1.0, 1.0));
        assert_eq!(u, Rect::from_ltrb(0.0, 0.0, 5.0, 3.0));
    }

    #[test]
    fn test_line_plain_text_drops_blank_spans() {
        let span = |t: &str| Span {
            text: t.to_string(),
            bbox: Rect::default(),
            size: 10.0,
            bold: false,
            italic: false,
            chars: Vec::new(),
        };
        let line = Line {
            bbox: Rect::default(),
            spans: vec![span("Finding:"), span("   "), span("no MFA ")],
        };
        assert_eq!(line.plain_text(), "Finding: no MFA");
    }

    #[test]
    fn test_span_clip_by_char_centers() {
        let text = "ab cd";
        let chars: Vec<Rect> = (0..5).map(|i| Rect::new(i as f32 * 10.0, 0.0, 10.0, 10.0)).collect();
        let span = Span {
            text: text.to_string(),
            bbox: Rect::new(0.0, 0.0, 50.0, 10.0),
            size: 10.0,
            bold: true,
            italic: false,
            chars,
        };

        let right = span.clip(&Rect::new(28.0, 0.0, 30.0, 10.0)).unwrap();
        assert_eq!(right.text, "cd");
        assert!(right.bold);
        assert_eq!(right.bbox, Rect::new(30.0, 0.0, 20.0, 10.0));

        assert!(span.clip(&Rect::new(100.0, 0.0, 10.0, 10.0)).is_none());
    }
}
