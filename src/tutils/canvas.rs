//! A canvas that records the call sequence instead of painting.

use crate::{
    canvas::{Canvas, Color},
    geom::Rect,
};

/// One recorded canvas call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Save,
    RestoreToCount(usize),
    Translate(i32, i32),
    ClipRect(Rect),
    FillRect(Rect, Color),
}

/// Records every call made against it, for asserting on draw-traversal
/// output. The save stack is simulated with a depth counter so tests
/// can check that traversals restore what they save.
#[derive(Debug, Default)]
pub struct TestCanvas {
    /// The recorded call sequence.
    pub ops: Vec<Op>,
    depth: usize,
}

impl TestCanvas {
    /// An empty recording canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every save has been restored.
    pub fn balanced(&self) -> bool {
        self.depth == 0
    }

    /// The recorded fill calls, in order.
    pub fn fills(&self) -> Vec<(Rect, Color)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::FillRect(r, c) => Some((*r, *c)),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for TestCanvas {
    fn save(&mut self) -> usize {
        self.ops.push(Op::Save);
        let token = self.depth;
        self.depth += 1;
        token
    }

    fn restore_to_count(&mut self, count: usize) {
        self.ops.push(Op::RestoreToCount(count));
        self.depth = count;
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.ops.push(Op::Translate(dx, dy));
    }

    fn clip_rect(&mut self, r: Rect) {
        self.ops.push(Op::ClipRect(r));
    }

    fn fill_rect(&mut self, r: Rect, color: Color) {
        self.ops.push(Op::FillRect(r, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_balances() {
        let mut c = TestCanvas::new();
        let t = c.save();
        c.translate(3, 4);
        c.fill_rect(Rect::new(0, 0, 5, 5), Color::rgb(1, 2, 3));
        assert!(!c.balanced());
        c.restore_to_count(t);
        assert!(c.balanced());
        assert_eq!(c.fills(), vec![(Rect::new(0, 0, 5, 5), Color::rgb(1, 2, 3))]);
    }

    #[test]
    fn restore_pops_nested_saves() {
        let mut c = TestCanvas::new();
        let outer = c.save();
        c.save();
        c.save();
        c.restore_to_count(outer);
        assert!(c.balanced());
    }
}
