//! Reading order strategies for page blocks

use super::layout::Block;

/// Orders the blocks of one page for output
pub trait ReadingOrder: Send + Sync {
    /// Indices into `blocks`, in reading order
    fn order(&self, blocks: &[Block]) -> Vec<usize>;
}

/// Sort by top edge, then left edge
///
/// Good for single-column reports; multi-column layouts interleave.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopLeftOrder;

impl ReadingOrder for TopLeftOrder {
    fn order(&self, blocks: &[Block]) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..blocks.len()).collect();
        idx.sort_by(|&a, &b| {
            let (a, b) = (&blocks[a].bbox, &blocks[b].bbox);
            a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
        });
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::Rect;

    #[test]
    fn test_top_then_left() {
        let blocks: Vec<Block> = [(300.0, 50.0), (20.0, 200.0), (10.0, 50.0)]
            .iter()
            .map(|&(x, y)| Block::text(Rect::new(x, y, 10.0, 10.0), vec![]))
            .collect();
        assert_eq!(TopLeftOrder.order(&blocks), vec![2, 0, 1]);
    }
}
