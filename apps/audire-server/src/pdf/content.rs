//! Page content stream scanning with lopdf
//!
//! MuPDF's structured text gives positions but no font weight or slant,
//! and no vector graphics. This module walks a page's content stream to
//! recover both:
//!
//! - ruling lines from stroked/filled paths (`m l re h` + paint operators),
//!   tracked through the current transformation matrix
//! - style marks at every text-showing operator, carrying bold/italic
//!   derived from the active font
//!
//! All output coordinates are top-left based, matching MuPDF.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::error::{PdfError, PdfResult};
use super::grid::Ruling;

/// Rect thinner than this (points) is treated as a single ruling
const THIN_RECT: f32 = 2.0;

/// Parent-chain depth limit for inherited page attributes
const MAX_INHERIT_DEPTH: usize = 32;

/// Font style at the origin of a text-showing operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleMark {
    pub x: f32,
    /// Baseline
    pub y: f32,
    pub bold: bool,
    pub italic: bool,
}

/// Vector rulings and style marks of one page
#[derive(Debug, Clone, Default)]
pub struct PageGraphics {
    pub rulings: Vec<Ruling>,
    pub marks: Vec<StyleMark>,
}

impl PageGraphics {
    /// Style of a glyph whose box spans `top..bottom` starting at `x`
    ///
    /// The nearest mark to the left on a baseline inside the glyph box
    /// wins. Glyphs without a mark are plain.
    pub fn style_at(&self, x: f32, top: f32, bottom: f32) -> (bool, bool) {
        const TOLERANCE: f32 = 1.0;

        self.marks
            .iter()
            .filter(|m| m.y >= top - TOLERANCE && m.y <= bottom + TOLERANCE)
            .filter(|m| m.x <= x + TOLERANCE)
            .max_by(|a, b| a.x.total_cmp(&b.x))
            .map(|m| (m.bold, m.italic))
            .unwrap_or((false, false))
    }
}

/// 2D affine matrix `[a b c d e f]`
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n`
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    Some(out)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a page attribute, following the `Parent` chain
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut id = page_id;
    for _ in 0..MAX_INHERIT_DEPTH {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Metrics and style of one font resource
#[derive(Debug, Clone)]
struct FontInfo {
    bold: bool,
    italic: bool,
    /// Two-byte character codes (Type0 fonts)
    composite: bool,
    first_char: i64,
    widths: Vec<f32>,
    default_width: f32,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            composite: false,
            first_char: 0,
            widths: Vec::new(),
            default_width: 500.0,
        }
    }
}

impl FontInfo {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let mut info = FontInfo::default();

        if let Some(base) = dict.get(b"BaseFont").ok().and_then(|o| o.as_name().ok()) {
            let (bold, italic) = style_from_name(&String::from_utf8_lossy(base));
            info.bold = bold;
            info.italic = italic;
        }

        info.composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Type0");

        let descriptor = dict
            .get(b"FontDescriptor")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok());
        if let Some(desc) = descriptor {
            let flags = desc.get(b"Flags").ok().and_then(number).unwrap_or(0.0) as i64;
            info.italic |= flags & (1 << 6) != 0;
            info.bold |= flags & (1 << 18) != 0;
            if desc.get(b"FontWeight").ok().and_then(number).unwrap_or(0.0) >= 600.0 {
                info.bold = true;
            }
            if let Some(w) = desc.get(b"MissingWidth").ok().and_then(number) {
                if w > 0.0 {
                    info.default_width = w;
                }
            }
        }

        if info.composite {
            info.default_width = 1000.0;
        }

        info.first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        if let Some(widths) = dict
            .get(b"Widths")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
        {
            info.widths = widths
                .iter()
                .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                .collect();
        }

        info
    }

    /// Glyph width in text space units (thousandths of an em)
    fn width(&self, code: u32) -> f32 {
        let idx = code as i64 - self.first_char;
        if idx >= 0 {
            if let Some(w) = self.widths.get(idx as usize) {
                return *w;
            }
        }
        self.default_width
    }
}

/// Bold/italic from a PostScript font name such as `ABCDEF+Arial-BoldItalicMT`
pub fn style_from_name(name: &str) -> (bool, bool) {
    let lower = name.to_lowercase();
    let bold = ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|k| lower.contains(k));
    let italic = ["italic", "oblique"].iter().any(|k| lower.contains(k));
    (bold, italic)
}

/// Graphics state saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    render_mode: i64,
    font: Option<Vec<u8>>,
    font_size: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            render_mode: 0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Page space to top-left coordinates
#[derive(Debug, Clone, Copy)]
struct PageFrame {
    left: f32,
    top: f32,
}

impl PageFrame {
    fn flip(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x - self.left, self.top - y)
    }
}

/// Content-stream interpreter state for one page
struct Scanner<'a> {
    fonts: &'a HashMap<Vec<u8>, FontInfo>,
    frame: PageFrame,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Current path in page space (before flip)
    segments: Vec<((f32, f32), (f32, f32))>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    out: PageGraphics,
}

impl<'a> Scanner<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, FontInfo>, frame: PageFrame) -> Self {
        Self {
            fonts,
            frame,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            segments: Vec::new(),
            current: None,
            subpath_start: None,
            out: PageGraphics::default(),
        }
    }

    fn font(&self) -> Option<&FontInfo> {
        self.state.font.as_ref().and_then(|name| self.fonts.get(name))
    }

    fn run(mut self, content: &Content) -> PageGraphics {
        for op in &content.operations {
            self.step(op.operator.as_str(), &op.operands);
        }
        self.out
    }

    fn step(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }

            // Path construction
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    let p = apply(&self.state.ctm, x, y);
                    self.current = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    let p = apply(&self.state.ctm, x, y);
                    if let Some(from) = self.current {
                        self.segments.push((from, p));
                    }
                    self.current = Some(p);
                }
            }
            "c" => {
                if let Some([.., x, y]) = numbers::<6>(operands) {
                    self.current = Some(apply(&self.state.ctm, x, y));
                }
            }
            "v" | "y" => {
                if let Some([.., x, y]) = numbers::<4>(operands) {
                    self.current = Some(apply(&self.state.ctm, x, y));
                }
            }
            "h" => self.close_subpath(),
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(operands) {
                    self.rectangle(x, y, w, h);
                }
            }

            // Path painting
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.flush_path();
            }
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.flush_path(),
            "n" => self.discard_path(),

            // Text state
            "Tc" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.horizontal_scale = v / 100.0;
                }
            }
            "TL" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.leading = v;
                }
            }
            "Tr" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.render_mode = v as i64;
                }
            }
            "Tf" => {
                if let (Some(name), Some(size)) = (
                    operands.first().and_then(|o| o.as_name().ok()),
                    operands.get(1).and_then(number),
                ) {
                    self.state.font = Some(name.to_vec());
                    self.state.font_size = size;
                }
            }

            // Text positioning
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let Some([aw, ac]) = numbers::<2>(operands) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Ok(items)) = operands.first().map(|o| o.as_array()) {
                    self.mark();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.advance_string(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0
                                        * self.state.font_size
                                        * self.state.horizontal_scale;
                                    self.translate_text(tx);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let ctm = self.state.ctm;
        let corners = [
            apply(&ctm, x, y),
            apply(&ctm, x + w, y),
            apply(&ctm, x + w, y + h),
            apply(&ctm, x, y + h),
        ];

        let xs = corners.map(|p| p.0);
        let ys = corners.map(|p| p.1);
        let (min_x, max_x) = (xs.iter().cloned().fold(f32::MAX, f32::min), xs.iter().cloned().fold(f32::MIN, f32::max));
        let (min_y, max_y) = (ys.iter().cloned().fold(f32::MAX, f32::min), ys.iter().cloned().fold(f32::MIN, f32::max));

        if max_y - min_y <= THIN_RECT && max_x - min_x > THIN_RECT {
            let mid = (min_y + max_y) / 2.0;
            self.segments.push(((min_x, mid), (max_x, mid)));
        } else if max_x - min_x <= THIN_RECT && max_y - min_y > THIN_RECT {
            let mid = (min_x + max_x) / 2.0;
            self.segments.push(((mid, min_y), (mid, max_y)));
        } else {
            for i in 0..4 {
                self.segments.push((corners[i], corners[(i + 1) % 4]));
            }
        }

        self.current = Some(corners[0]);
        self.subpath_start = Some(corners[0]);
    }

    fn flush_path(&mut self) {
        for (a, b) in self.segments.drain(..) {
            let (x0, y0) = self.frame.flip(a);
            let (x1, y1) = self.frame.flip(b);
            self.out.rulings.push(Ruling { x0, y0, x1, y1 });
        }
        self.current = None;
        self.subpath_start = None;
    }

    fn discard_path(&mut self) {
        self.segments.clear();
        self.current = None;
        self.subpath_start = None;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn translate_text(&mut self, tx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    /// Record a style mark at the current text origin
    fn mark(&mut self) {
        let (mut bold, italic) = self.font().map(|f| (f.bold, f.italic)).unwrap_or_default();
        // Fill-and-stroke is the usual synthetic bold
        if self.state.render_mode == 2 {
            bold = true;
        }
        let origin = apply(&multiply(&self.text_matrix, &self.state.ctm), 0.0, 0.0);
        let (x, y) = self.frame.flip(origin);
        self.out.marks.push(StyleMark { x, y, bold, italic });
    }

    fn show(&mut self, bytes: &[u8]) {
        self.mark();
        self.advance_string(bytes);
    }

    fn advance_string(&mut self, bytes: &[u8]) {
        let font = self.font().cloned().unwrap_or_default();
        let size = self.state.font_size;
        let scale = self.state.horizontal_scale;

        let mut tx = 0.0;
        if font.composite {
            for pair in bytes.chunks(2) {
                let code = pair.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                tx += (font.width(code) / 1000.0 * size + self.state.char_spacing) * scale;
            }
        } else {
            for &b in bytes {
                let mut w = font.width(b as u32) / 1000.0 * size + self.state.char_spacing;
                if b == b' ' {
                    w += self.state.word_spacing;
                }
                tx += w * scale;
            }
        }
        self.translate_text(tx);
    }
}

/// Content scanner over one loaded PDF
pub struct ContentScanner {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl ContentScanner {
    pub fn load(data: &[u8]) -> PdfResult<Self> {
        let doc = Document::load_mem(data)?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Rulings and style marks of the page at `index` (0-based)
    pub fn scan_page(&self, index: usize) -> PdfResult<PageGraphics> {
        let page_id = *self
            .pages
            .get(index)
            .ok_or(PdfError::PageNotFound(index, self.pages.len()))?;

        let frame = self.page_frame(page_id);
        let fonts = self.page_fonts(page_id);

        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| PdfError::Content {
                page: index,
                message: e.to_string(),
            })?;
        let content = Content::decode(&data).map_err(|e| PdfError::Content {
            page: index,
            message: e.to_string(),
        })?;

        let graphics = Scanner::new(&fonts, frame).run(&content);
        debug!(
            page = index,
            rulings = graphics.rulings.len(),
            marks = graphics.marks.len(),
            "Scanned page content"
        );
        Ok(graphics)
    }

    fn page_frame(&self, page_id: ObjectId) -> PageFrame {
        let media_box = inherited(&self.doc, page_id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| {
                let v: Vec<f32> = a.iter().filter_map(|o| number(resolve(&self.doc, o))).collect();
                (v.len() == 4).then(|| [v[0], v[1], v[2], v[3]])
            })
            .unwrap_or([0.0, 0.0, 612.0, 792.0]);

        PageFrame {
            left: media_box[0].min(media_box[2]),
            top: media_box[1].max(media_box[3]),
        }
    }

    fn page_fonts(&self, page_id: ObjectId) -> HashMap<Vec<u8>, FontInfo> {
        let mut fonts = HashMap::new();

        let font_dict = inherited(&self.doc, page_id, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .and_then(|res| res.get(b"Font").ok())
            .map(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_dict().ok());

        if let Some(font_dict) = font_dict {
            for (name, value) in font_dict.iter() {
                if let Ok(dict) = resolve(&self.doc, value).as_dict() {
                    fonts.insert(name.clone(), FontInfo::from_dict(&self.doc, dict));
                }
            }
        }

        fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn scan(ops: Vec<Operation>, fonts: &HashMap<Vec<u8>, FontInfo>) -> PageGraphics {
        let content = Content { operations: ops };
        Scanner::new(fonts, PageFrame { left: 0.0, top: 800.0 }).run(&content)
    }

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn ints(values: &[i64]) -> Vec<Object> {
        values.iter().map(|v| Object::Integer(*v)).collect()
    }

    #[test]
    fn test_style_from_name() {
        assert_eq!(style_from_name("ABCDEF+Arial-BoldItalicMT"), (true, true));
        assert_eq!(style_from_name("Helvetica-Oblique"), (false, true));
        assert_eq!(style_from_name("TimesNewRomanPSMT"), (false, false));
        assert_eq!(style_from_name("Lato-Black"), (true, false));
    }

    #[test]
    fn test_stroked_line_is_flipped() {
        let g = scan(
            vec![
                op("m", ints(&[50, 700])),
                op("l", ints(&[400, 700])),
                op("S", vec![]),
            ],
            &HashMap::new(),
        );
        assert_eq!(g.rulings, vec![Ruling { x0: 50.0, y0: 100.0, x1: 400.0, y1: 100.0 }]);
    }

    #[test]
    fn test_thin_rect_becomes_one_ruling() {
        let g = scan(
            vec![op("re", ints(&[50, 700, 350, 1])), op("f", vec![])],
            &HashMap::new(),
        );
        assert_eq!(g.rulings.len(), 1);
        let r = g.rulings[0];
        assert_eq!((r.x0, r.x1), (50.0, 400.0));
        assert!((r.y0 - 99.5).abs() < 1e-3);
    }

    #[test]
    fn test_rect_outline_and_ctm() {
        let g = scan(
            vec![
                op("q", vec![]),
                op("cm", ints(&[1, 0, 0, 1, 10, 0])),
                op("re", ints(&[0, 0, 100, 50])),
                op("S", vec![]),
                op("Q", vec![]),
                op("re", ints(&[0, 0, 100, 50])),
                op("n", vec![]),
            ],
            &HashMap::new(),
        );
        assert_eq!(g.rulings.len(), 4);
        assert!(g.rulings.iter().all(|r| r.x0 >= 10.0 && r.x1 <= 110.0));
    }

    #[test]
    fn test_marks_follow_fonts_and_advance() {
        let mut fonts = HashMap::new();
        fonts.insert(
            b"F1".to_vec(),
            FontInfo {
                bold: true,
                widths: vec![500.0; 256],
                ..FontInfo::default()
            },
        );
        fonts.insert(b"F2".to_vec(), FontInfo::default());

        let g = scan(
            vec![
                op("BT", vec![]),
                op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                op("Td", ints(&[72, 700])),
                op("Tj", vec![Object::string_literal("Bold")]),
                op("Tf", vec![Object::Name(b"F2".to_vec()), Object::Integer(10)]),
                op("Tj", vec![Object::string_literal(" plain")]),
                op("ET", vec![]),
            ],
            &fonts,
        );

        assert_eq!(g.marks.len(), 2);
        assert_eq!((g.marks[0].x, g.marks[0].y), (72.0, 100.0));
        assert!(g.marks[0].bold);
        // Four glyphs of 500/1000 em at 10pt
        assert!((g.marks[1].x - 92.0).abs() < 1e-3);
        assert!(!g.marks[1].bold);

        assert_eq!(g.style_at(75.0, 92.0, 102.0), (true, false));
        assert_eq!(g.style_at(95.0, 92.0, 102.0), (false, false));
        assert_eq!(g.style_at(75.0, 300.0, 310.0), (false, false));
    }
}
