//! The draw traversal: background, content, child fan-out, decorations,
//! with canvas save/restore balance guaranteed on every path.

use scopeguard::guard;
use tracing::trace;

use crate::{
    canvas::Canvas,
    error::Result,
    geom::Rect,
    node::{NodeId, Visibility},
    tree::Tree,
};

impl Tree {
    /// Draw a node and its subtree. The canvas arrives in the node's
    /// content coordinate space (the parent has already translated by
    /// frame offset and scroll). Invisible nodes draw nothing.
    pub fn draw(&mut self, id: NodeId, canvas: &mut dyn Canvas) -> Result<()> {
        let n = self.node(id)?;
        if n.flags.visibility != Visibility::Visible {
            return Ok(());
        }
        let count = canvas.save();
        let mut canvas = guard(canvas, move |c| c.restore_to_count(count));

        let (w, h) = (n.width(), n.height());
        let (sx, sy) = n.scroll();

        // Background first, pinned to the viewport: content coordinates
        // are unscrolled, so the viewport origin sits at the scroll
        // offset.
        {
            let n = self.node_mut(id)?;
            if let Some(bg) = n.background.as_mut() {
                if n.background_size_changed {
                    bg.set_bounds(Rect::new(0, 0, w, h));
                    n.background_size_changed = false;
                }
                if sx == 0 && sy == 0 {
                    bg.draw(&mut **canvas);
                } else {
                    canvas.translate(sx, sy);
                    bg.draw(&mut **canvas);
                    canvas.translate(-sx, -sy);
                }
            }
            n.flags.drawn = true;
        }

        if let Some(r) = self.with_behavior(id, |b, t, id| b.draw_content(t, id, &mut **canvas)) {
            r?;
        }
        self.dispatch_draw(id, &mut **canvas)?;
        if let Some(r) = self.with_behavior(id, |b, t, id| b.draw_decorations(t, id, &mut **canvas)) {
            r?;
        }
        Ok(())
    }

    /// Fan drawing out to children in paint order, optionally through
    /// the draw-order hook and clipped to the padding box. Leaves have
    /// no children and return immediately.
    pub fn dispatch_draw(&mut self, id: NodeId, canvas: &mut dyn Canvas) -> Result<()> {
        let n = self.node(id)?;
        let Some(g) = n.group_ref() else {
            return Ok(());
        };
        if g.children.is_empty() {
            return Ok(());
        }
        let clip_to_padding = g.clip_to_padding;
        let (w, h) = (n.width(), n.height());
        let (sx, sy) = n.scroll();
        let pad = n.padding();

        let count = canvas.save();
        let mut canvas = guard(canvas, move |c| c.restore_to_count(count));
        if clip_to_padding {
            canvas.clip_rect(Rect::new(
                sx + pad.left,
                sy + pad.top,
                sx + w - pad.right,
                sy + h - pad.bottom,
            ));
        }

        let children = self.children_of(id);
        let len = children.len();
        for i in 0..len {
            let idx = self
                .with_behavior(id, |b, _, _| b.child_draw_order(len, i))
                .unwrap_or(i);
            let Some(&child) = children.get(idx) else {
                continue;
            };
            if !self.contains(child) {
                continue;
            }
            self.draw_child(id, child, &mut **canvas)?;
        }
        Ok(())
    }

    /// Draw one child: translate into its content space, optionally clip
    /// to its viewport, then either the full draw sequence or, for
    /// children that paint nothing themselves, straight to their own
    /// child fan-out.
    fn draw_child(&mut self, parent: NodeId, child: NodeId, canvas: &mut dyn Canvas) -> Result<()> {
        let c = self.node(child)?;
        if c.flags.visibility != Visibility::Visible {
            return Ok(());
        }
        let f = c.frame();
        let (sx, sy) = c.scroll();
        let skip_draw = c.flags.will_not_draw && c.background.is_none();
        let clip_children = self
            .node(parent)?
            .group_ref()
            .map(|g| g.clip_children)
            .unwrap_or(false);

        let count = canvas.save();
        let mut canvas = guard(canvas, move |c| c.restore_to_count(count));
        canvas.translate(f.left - sx, f.top - sy);
        if clip_children {
            // The child's viewport, in its content coordinates.
            canvas.clip_rect(Rect::new(sx, sy, sx + f.width(), sy + f.height()));
        }
        if skip_draw {
            trace!(node = child.raw(), "skip-draw fast path");
            self.node_mut(child)?.flags.drawn = true;
            self.dispatch_draw(child, &mut **canvas)?;
        } else {
            self.draw(child, &mut **canvas)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::{Color, ColorDrawable},
        node::Node,
        tutils::{Op, TestCanvas},
    };

    #[test]
    fn draw_marks_drawn_and_balances_canvas() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let a = t.insert_child(
            g,
            Node::new().with_background(Box::new(ColorDrawable::new(Color::rgb(9, 9, 9)))),
        )?;
        t.layout(g, 0, 0, 100, 100)?;
        t.layout(a, 10, 10, 90, 90)?;

        let mut c = TestCanvas::new();
        t.draw(g, &mut c)?;
        assert!(t.node(g)?.flags.drawn);
        assert!(t.node(a)?.flags.drawn);
        assert!(c.balanced(), "every save was restored: {:?}", c.ops);
        assert!(
            c.ops.contains(&Op::FillRect(Rect::new(0, 0, 80, 80), Color::rgb(9, 9, 9))),
            "background painted at bound size: {:?}",
            c.ops
        );
        Ok(())
    }

    #[test]
    fn children_translated_and_clipped() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let a = t.insert_child(
            g,
            Node::new().with_background(Box::new(ColorDrawable::new(Color::rgb(1, 2, 3)))),
        )?;
        t.layout(g, 0, 0, 200, 100)?;
        t.layout(a, 30, 40, 130, 90)?;
        t.scroll_to(a, 5, 0)?;

        let mut c = TestCanvas::new();
        t.draw(g, &mut c)?;
        // Child canvas is translated to its content origin: frame offset
        // minus its own scroll.
        assert!(c.ops.contains(&Op::Translate(25, 40)), "{:?}", c.ops);
        // And clipped to its viewport in content coordinates.
        assert!(c.ops.contains(&Op::ClipRect(Rect::new(5, 0, 105, 50))), "{:?}", c.ops);
        Ok(())
    }

    #[test]
    fn invisible_children_are_skipped() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let a = t.insert_child(
            g,
            Node::new().with_background(Box::new(ColorDrawable::new(Color::rgb(7, 7, 7)))),
        )?;
        t.layout(g, 0, 0, 100, 100)?;
        t.layout(a, 0, 0, 100, 100)?;
        t.set_visibility(a, Visibility::Invisible)?;

        let mut c = TestCanvas::new();
        t.draw(g, &mut c)?;
        assert!(
            !c.ops.iter().any(|op| matches!(op, Op::FillRect(..))),
            "invisible child painted: {:?}",
            c.ops
        );
        Ok(())
    }

    #[test]
    fn clip_to_padding_applies_scrolled_padding_box() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let _a = t.insert_child(g, Node::new())?;
        t.set_padding(g, crate::geom::Insets::uniform(8))?;
        t.layout(g, 0, 0, 100, 100)?;
        t.scroll_to(g, 3, 4)?;

        let mut c = TestCanvas::new();
        t.draw(g, &mut c)?;
        assert!(
            c.ops.contains(&Op::ClipRect(Rect::new(11, 12, 95, 96))),
            "{:?}",
            c.ops
        );
        Ok(())
    }

    #[test]
    fn background_translates_with_scroll() -> Result<()> {
        let mut t = Tree::new();
        let id = t.insert(
            Node::new().with_background(Box::new(ColorDrawable::new(Color::rgb(4, 5, 6)))),
        );
        t.layout(id, 0, 0, 50, 50)?;
        t.scroll_to(id, 10, 20)?;

        let mut c = TestCanvas::new();
        t.draw(id, &mut c)?;
        let i = c.ops.iter().position(|o| *o == Op::Translate(10, 20)).unwrap();
        assert!(matches!(c.ops[i + 1], Op::FillRect(..)));
        assert_eq!(c.ops[i + 2], Op::Translate(-10, -20));
        Ok(())
    }
}
