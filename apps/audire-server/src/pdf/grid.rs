//! Line-based table grid finder
//!
//! Tables are inferred from ruling lines only: horizontal and vertical
//! rulings are snapped and joined into edges, their intersections become
//! junctions, and every smallest rectangle whose four corners are joined
//! by edges becomes a cell. Cells that share a corner belong to the same
//! table.

use std::collections::{BTreeMap, HashMap};

use super::layout::{Rect, TableCell, TableRegion};

/// A straight ruling segment in top-left page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Ruling {
    pub fn horizontal(x0: f32, x1: f32, y: f32) -> Self {
        Self { x0: x0.min(x1), y0: y, x1: x0.max(x1), y1: y }
    }

    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self { x0: x, y0: y0.min(y1), x1: x, y1: y0.max(y1) }
    }
}

/// A positioned character used to fill cells with text
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub bbox: Rect,
    /// Index of the layout line the glyph came from
    pub line: usize,
}

/// Tolerances for the grid finder (points)
#[derive(Debug, Clone)]
pub struct GridSettings {
    pub snap_tolerance: f32,
    pub join_tolerance: f32,
    pub intersection_tolerance: f32,
    pub min_edge_length: f32,
    /// Maximum thickness for a segment to count as axis-aligned
    pub flat_tolerance: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            min_edge_length: 3.0,
            flat_tolerance: 1.0,
        }
    }
}

/// Axis-aligned edge: `pos` is y for horizontal edges, x for vertical ones
#[derive(Debug, Clone, Copy)]
struct Edge {
    pos: f32,
    start: f32,
    end: f32,
}

impl Edge {
    fn length(&self) -> f32 {
        self.end - self.start
    }
}

/// Coordinate key: hundredths of a point
type Key = i64;

fn key(v: f32) -> Key {
    (v * 100.0).round() as Key
}

#[derive(Debug, Default)]
struct Junction {
    x: f32,
    y: f32,
    h: Vec<usize>,
    v: Vec<usize>,
}

fn shares(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|i| b.contains(i))
}

/// Find all ruled tables on a page
pub fn find_tables(rulings: &[Ruling], glyphs: &[Glyph], settings: &GridSettings) -> Vec<TableRegion> {
    let (horizontal, vertical) = split_rulings(rulings, settings);
    if horizontal.is_empty() || vertical.is_empty() {
        return Vec::new();
    }

    let horizontal = prepare(horizontal, settings);
    let vertical = prepare(vertical, settings);

    let junctions = intersections(&horizontal, &vertical, settings.intersection_tolerance);
    let cells = junctions_to_cells(&junctions);
    let mut tables: Vec<TableRegion> = group_cells(cells)
        .into_iter()
        .filter(|group| group.len() >= 2)
        .map(|group| build_region(group, glyphs))
        .collect();

    tables.sort_by(|a, b| {
        a.bbox
            .y
            .total_cmp(&b.bbox.y)
            .then(a.bbox.x.total_cmp(&b.bbox.x))
    });
    tables
}

fn split_rulings(rulings: &[Ruling], settings: &GridSettings) -> (Vec<Edge>, Vec<Edge>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for r in rulings {
        let dx = (r.x1 - r.x0).abs();
        let dy = (r.y1 - r.y0).abs();
        if dy <= settings.flat_tolerance && dx > 0.0 {
            horizontal.push(Edge {
                pos: (r.y0 + r.y1) / 2.0,
                start: r.x0.min(r.x1),
                end: r.x0.max(r.x1),
            });
        } else if dx <= settings.flat_tolerance && dy > 0.0 {
            vertical.push(Edge {
                pos: (r.x0 + r.x1) / 2.0,
                start: r.y0.min(r.y1),
                end: r.y0.max(r.y1),
            });
        }
    }

    (horizontal, vertical)
}

/// Snap, join and length-filter one orientation of edges
fn prepare(edges: Vec<Edge>, settings: &GridSettings) -> Vec<Edge> {
    let snapped = snap(edges, settings.snap_tolerance);
    join(snapped, settings.join_tolerance)
        .into_iter()
        .filter(|e| e.length() >= settings.min_edge_length)
        .collect()
}

/// Move edges whose positions are within `tolerance` of their neighbour
/// onto the cluster mean
fn snap(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    edges.sort_by(|a, b| a.pos.total_cmp(&b.pos));

    let mut clusters: Vec<Vec<Edge>> = Vec::new();
    for edge in edges {
        match clusters.last_mut() {
            Some(cluster)
                if cluster
                    .last()
                    .is_some_and(|last| edge.pos - last.pos <= tolerance) =>
            {
                cluster.push(edge)
            }
            _ => clusters.push(vec![edge]),
        }
    }

    clusters
        .into_iter()
        .flat_map(|cluster| {
            let mean = cluster.iter().map(|e| e.pos).sum::<f32>() / cluster.len() as f32;
            cluster.into_iter().map(move |e| Edge { pos: mean, ..e })
        })
        .collect()
}

/// Merge collinear edges that overlap or nearly touch
fn join(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    edges.sort_by(|a, b| {
        key(a.pos)
            .cmp(&key(b.pos))
            .then(a.start.total_cmp(&b.start))
    });

    let mut joined: Vec<Edge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match joined.last_mut() {
            Some(cur) if key(cur.pos) == key(edge.pos) && edge.start <= cur.end + tolerance => {
                cur.end = cur.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

/// Junctions keyed by `(y, x)` so iteration runs top-to-bottom, left-to-right
fn intersections(
    horizontal: &[Edge],
    vertical: &[Edge],
    tolerance: f32,
) -> BTreeMap<(Key, Key), Junction> {
    let mut junctions: BTreeMap<(Key, Key), Junction> = BTreeMap::new();

    for (vi, v) in vertical.iter().enumerate() {
        for (hi, h) in horizontal.iter().enumerate() {
            let crosses = v.pos >= h.start - tolerance
                && v.pos <= h.end + tolerance
                && h.pos >= v.start - tolerance
                && h.pos <= v.end + tolerance;
            if !crosses {
                continue;
            }
            let j = junctions.entry((key(h.pos), key(v.pos))).or_default();
            j.x = v.pos;
            j.y = h.pos;
            j.h.push(hi);
            j.v.push(vi);
        }
    }

    junctions
}

/// Smallest cell anchored at each junction's top-left corner
fn junctions_to_cells(junctions: &BTreeMap<(Key, Key), Junction>) -> Vec<Rect> {
    let points: Vec<(&(Key, Key), &Junction)> = junctions.iter().collect();
    let mut cells = Vec::new();

    for (i, ((py, px), p)) in points.iter().enumerate() {
        let rest = &points[i + 1..];
        let below: Vec<_> = rest.iter().filter(|((_, x), _)| x == px).collect();
        let right: Vec<_> = rest.iter().filter(|((y, _), _)| y == py).collect();

        'search: for ((by, _), b) in &below {
            if !shares(&p.v, &b.v) {
                continue;
            }
            for ((_, rx), r) in &right {
                if !shares(&p.h, &r.h) {
                    continue;
                }
                let Some(corner) = junctions.get(&(*by, *rx)) else {
                    continue;
                };
                if shares(&corner.v, &r.v) && shares(&corner.h, &b.h) {
                    cells.push(Rect::from_ltrb(p.x, p.y, r.x, b.y));
                    break 'search;
                }
            }
        }
    }

    cells
}

fn corners(cell: &Rect) -> [(Key, Key); 4] {
    let (l, t, r, b) = (key(cell.x), key(cell.y), key(cell.right()), key(cell.bottom()));
    [(l, t), (r, t), (l, b), (r, b)]
}

/// Group cells sharing at least one corner (union-find)
fn group_cells(cells: Vec<Rect>) -> Vec<Vec<Rect>> {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..cells.len()).collect();
    let mut owner: HashMap<(Key, Key), usize> = HashMap::new();

    for (i, cell) in cells.iter().enumerate() {
        for corner in corners(cell) {
            match owner.get(&corner) {
                Some(&j) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    owner.insert(corner, i);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<Rect>> = BTreeMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(cell);
    }
    groups.into_values().collect()
}

fn build_region(cells: Vec<Rect>, glyphs: &[Glyph]) -> TableRegion {
    let mut tops: Vec<Key> = cells.iter().map(|c| key(c.y)).collect();
    tops.sort_unstable();
    tops.dedup();
    let mut lefts: Vec<Key> = cells.iter().map(|c| key(c.x)).collect();
    lefts.sort_unstable();
    lefts.dedup();

    let mut rows: Vec<Vec<Option<TableCell>>> = vec![vec![None; lefts.len()]; tops.len()];
    let mut bbox: Option<Rect> = None;

    for cell in cells {
        bbox = Some(match bbox {
            Some(b) => b.union(&cell),
            None => cell,
        });
        let (Ok(r), Ok(c)) = (tops.binary_search(&key(cell.y)), lefts.binary_search(&key(cell.x)))
        else {
            continue;
        };
        rows[r][c] = Some(TableCell {
            text: cell_text(&cell, glyphs),
            bbox: cell,
        });
    }

    TableRegion {
        bbox: bbox.unwrap_or_default(),
        rows,
    }
}

/// Text of the glyphs whose centers fall inside `cell`, one line per
/// source layout line
pub fn cell_text(cell: &Rect, glyphs: &[Glyph]) -> String {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for g in glyphs {
        let (cx, cy) = g.bbox.center();
        if !cell.contains(cx, cy) {
            continue;
        }
        match lines.last_mut() {
            Some((line, text)) if *line == g.line => text.push(g.ch),
            _ => lines.push((g.line, g.ch.to_string())),
        }
    }

    lines
        .iter()
        .map(|(_, text)| text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full grid with rows at `ys` and columns at `xs`
    fn grid(xs: &[f32], ys: &[f32]) -> Vec<Ruling> {
        let (x0, x1) = (xs[0], xs[xs.len() - 1]);
        let (y0, y1) = (ys[0], ys[ys.len() - 1]);
        ys.iter()
            .map(|&y| Ruling::horizontal(x0, x1, y))
            .chain(xs.iter().map(|&x| Ruling::vertical(x, y0, y1)))
            .collect()
    }

    fn word(text: &str, x: f32, y: f32, line: usize) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| Glyph {
                ch,
                bbox: Rect::new(x + i as f32 * 5.0, y, 5.0, 10.0),
                line,
            })
            .collect()
    }

    #[test]
    fn test_two_by_two_grid() {
        let rulings = grid(&[50.0, 150.0, 400.0], &[100.0, 120.0, 140.0]);
        let mut glyphs = word("Finding", 155.0, 105.0, 0);
        glyphs.extend(word("Weak passwords", 155.0, 125.0, 1));

        let tables = find_tables(&rulings, &glyphs, &GridSettings::default());
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.bbox, Rect::from_ltrb(50.0, 100.0, 400.0, 140.0));

        let text = table.text_rows();
        assert_eq!(text[0][1].as_deref(), Some("Finding"));
        assert_eq!(text[1][1].as_deref(), Some("Weak passwords"));
        assert_eq!(text[1][0].as_deref(), Some(""));
    }

    #[test]
    fn test_single_box_is_not_a_table() {
        let rulings = grid(&[50.0, 400.0], &[100.0, 140.0]);
        assert!(find_tables(&rulings, &[], &GridSettings::default()).is_empty());
    }

    #[test]
    fn test_horizontal_rules_alone_find_nothing() {
        let rulings = vec![
            Ruling::horizontal(50.0, 400.0, 100.0),
            Ruling::horizontal(50.0, 400.0, 120.0),
            Ruling::horizontal(50.0, 400.0, 140.0),
        ];
        assert!(find_tables(&rulings, &[], &GridSettings::default()).is_empty());
    }

    #[test]
    fn test_near_misses_are_snapped_and_joined() {
        let rulings = vec![
            Ruling::horizontal(50.0, 200.0, 100.0),
            Ruling::horizontal(201.5, 400.0, 101.0),
            Ruling::horizontal(50.0, 400.0, 140.0),
            Ruling::horizontal(50.0, 400.0, 180.0),
            Ruling::vertical(50.0, 100.0, 180.0),
            Ruling::vertical(151.0, 99.0, 180.0),
            Ruling::vertical(400.0, 100.0, 180.0),
        ];

        let tables = find_tables(&rulings, &[], &GridSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].column_count(), 2);
    }

    #[test]
    fn test_separate_grids_are_separate_tables() {
        let mut rulings = grid(&[50.0, 150.0, 400.0], &[100.0, 120.0]);
        rulings.extend(grid(&[50.0, 150.0, 400.0], &[300.0, 320.0, 340.0]));

        let tables = find_tables(&rulings, &[], &GridSettings::default());
        assert_eq!(tables.len(), 2);
        assert!(tables[0].bbox.y < tables[1].bbox.y);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[1].rows.len(), 2);
    }

    #[test]
    fn test_spanning_cell_leaves_gap() {
        // Header spans both columns
        let rulings = vec![
            Ruling::horizontal(50.0, 400.0, 100.0),
            Ruling::horizontal(50.0, 400.0, 120.0),
            Ruling::horizontal(50.0, 400.0, 140.0),
            Ruling::vertical(50.0, 100.0, 140.0),
            Ruling::vertical(400.0, 100.0, 140.0),
            Ruling::vertical(150.0, 120.0, 140.0),
        ];

        let tables = find_tables(&rulings, &[], &GridSettings::default());
        assert_eq!(tables.len(), 1);
        let rows = &tables[0].rows;
        assert!(rows[0][0].is_some());
        assert!(rows[0][1].is_none());
        assert!(rows[1][0].is_some() && rows[1][1].is_some());
    }

    #[test]
    fn test_cell_text_keeps_line_breaks() {
        let cell = Rect::from_ltrb(0.0, 0.0, 200.0, 40.0);
        let mut glyphs = word("first", 5.0, 2.0, 3);
        glyphs.extend(word("second", 5.0, 20.0, 4));
        glyphs.extend(word("outside", 300.0, 2.0, 3));
        assert_eq!(cell_text(&cell, &glyphs), "first\nsecond");
    }
}
