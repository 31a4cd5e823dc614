//! Styled HTML fragments from page geometry

use super::layout::{Line, PageLayout, Rect, Span};

/// Margin added around the target rectangle before clipping
pub const CLIP_MARGIN: f32 = 1.0;

/// Render the text of `page` that falls inside `rect` as styled spans
///
/// Returns an empty string when no text overlaps; callers fall back to
/// the plain text they already have.
pub fn render(page: &PageLayout, rect: &Rect) -> String {
    let clip = rect.expand(CLIP_MARGIN);

    page.blocks
        .iter()
        .filter(|b| b.is_text() && b.bbox.intersects(&clip))
        .filter_map(|block| {
            let lines: Vec<String> = block
                .lines()
                .iter()
                .map(|line| render_spans(line.spans.iter().filter_map(|s| s.clip(&clip))))
                .filter(|l| !l.is_empty())
                .collect();
            (!lines.is_empty()).then(|| lines.join(" "))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a whole line
pub fn render_line(line: &Line) -> String {
    render_spans(line.spans.iter().cloned())
}

fn render_spans(spans: impl Iterator<Item = Span>) -> String {
    spans
        .filter_map(|s| span_html(&s))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `<span>` for one run, `None` for whitespace-only runs
pub fn span_html(span: &Span) -> Option<String> {
    let text = span.text.trim();
    if text.is_empty() {
        return None;
    }

    let mut style = String::new();
    if span.bold {
        style.push_str("font-weight:bold;");
    }
    if span.italic {
        style.push_str("font-style:italic;");
    }

    let text = html_escape::encode_text(text);
    Some(if style.is_empty() {
        format!("<span>{text}</span>")
    } else {
        format!("<span style=\"{style}\">{text}</span>")
    })
}
