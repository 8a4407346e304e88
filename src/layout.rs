//! Measurement, layout, and the invalidation protocol.
//!
//! Measurement propagates constraints top-down ([`Tree::measure`]),
//! layout assigns frames top-down ([`Tree::layout`]), and invalidation
//! bubbles dirty regions bottom-up where the root coalesces them until
//! the next traversal.

use tracing::trace;

use crate::{
    error::{Error, Result},
    geom::{Insets, Point, Rect},
    measure::{MeasureSpec, child_measure_spec, default_size},
    node::{NodeId, Visibility},
    tree::Tree,
};

impl Tree {
    /// Record the result of a measure pass. Measure hooks must call this
    /// exactly once per invocation.
    pub fn set_measured_dimension(&mut self, id: NodeId, width: u32, height: u32) -> Result<()> {
        let n = self.node_mut(id)?;
        n.measured_width = width;
        n.measured_height = height;
        n.flags.measured_dimension_set = true;
        Ok(())
    }

    /// The intrinsic minimum width folded into default measurement: the
    /// larger of the node's declared minimum and its background's.
    pub fn suggested_minimum_width(&self, id: NodeId) -> Result<u32> {
        let n = self.node(id)?;
        let bg = n.background.as_ref().map_or(0, |b| b.min_width());
        Ok(n.min_width.max(bg))
    }

    /// The intrinsic minimum height folded into default measurement.
    pub fn suggested_minimum_height(&self, id: NodeId) -> Result<u32> {
        let n = self.node(id)?;
        let bg = n.background.as_ref().map_or(0, |b| b.min_height());
        Ok(n.min_height.max(bg))
    }

    /// The default measure hook: resolve intrinsic minimums against the
    /// constraints.
    pub fn measure_default(
        &mut self,
        id: NodeId,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Result<()> {
        let w = default_size(self.suggested_minimum_width(id)?, width_spec);
        let h = default_size(self.suggested_minimum_height(id)?, height_spec);
        self.set_measured_dimension(id, w, h)
    }

    /// Measure a node against the given constraints. Skipped entirely
    /// when the constraints match the previous measure and no layout has
    /// been forced since.
    ///
    /// # Panics
    ///
    /// Panics if the node's measure hook returns without calling
    /// [`Tree::set_measured_dimension`].
    pub fn measure(
        &mut self,
        id: NodeId,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Result<()> {
        let n = self.node_mut(id)?;
        let stale = n.flags.force_layout
            || n.old_width_spec != Some(width_spec)
            || n.old_height_spec != Some(height_spec);
        if !stale {
            return Ok(());
        }
        n.flags.measured_dimension_set = false;

        match self.with_behavior(id, |b, t, id| b.measure(t, id, width_spec, height_spec)) {
            Some(r) => r?,
            None => self.measure_default(id, width_spec, height_spec)?,
        }

        let n = self.node_mut(id)?;
        assert!(
            n.flags.measured_dimension_set,
            "measure hook for node {id} did not set measured dimensions"
        );
        n.flags.layout_required = true;
        n.old_width_spec = Some(width_spec);
        n.old_height_spec = Some(height_spec);
        Ok(())
    }

    /// Measure every non-Gone child of a composite against its own
    /// constraints and padding.
    pub fn measure_children(
        &mut self,
        id: NodeId,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Result<()> {
        for c in self.children_of(id) {
            if self.node(c)?.flags.visibility != Visibility::Gone {
                self.measure_child(id, c, width_spec, height_spec)?;
            }
        }
        Ok(())
    }

    /// Measure one child, deducting the parent's padding from the space
    /// on offer.
    pub fn measure_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Result<()> {
        let p = self.node(parent)?.padding();
        self.measure_child_with_used(parent, child, width_spec, 0, height_spec, 0, p)
    }

    /// Measure one child with margins and already-consumed space
    /// deducted alongside padding.
    pub fn measure_child_with_margins(
        &mut self,
        parent: NodeId,
        child: NodeId,
        width_spec: MeasureSpec,
        width_used: i32,
        height_spec: MeasureSpec,
        height_used: i32,
    ) -> Result<()> {
        let p = self.node(parent)?.padding();
        let m = self.node(child)?.layout_params().margins;
        self.measure_child_with_used(
            parent,
            child,
            width_spec,
            width_used + m.left + m.right,
            height_spec,
            height_used + m.top + m.bottom,
            p,
        )
    }

    fn measure_child_with_used(
        &mut self,
        _parent: NodeId,
        child: NodeId,
        width_spec: MeasureSpec,
        width_used: i32,
        height_spec: MeasureSpec,
        height_used: i32,
        pad: Insets,
    ) -> Result<()> {
        let lp = self.node(child)?.layout_params();
        let cw = child_measure_spec(width_spec, pad.left + pad.right + width_used, lp.width);
        let ch = child_measure_spec(height_spec, pad.top + pad.bottom + height_used, lp.height);
        self.measure(child, cw, ch)
    }

    /// Assign a node's frame and run its arrange hook when the frame
    /// changed or a measure pass demanded it. Calling twice with the
    /// same frame and no intervening measure is a no-op.
    pub fn layout(&mut self, id: NodeId, l: i32, t: i32, r: i32, b: i32) -> Result<()> {
        let changed = self.set_frame(id, l, t, r, b)?;
        let n = self.node(id)?;
        if changed || n.flags.layout_required {
            let frame = n.frame();
            if let Some(res) = self.with_behavior(id, |bh, tr, id| bh.arrange(tr, id, changed, frame))
            {
                res?;
            }
            self.node_mut(id)?.flags.layout_required = false;
        }
        self.node_mut(id)?.flags.force_layout = false;
        Ok(())
    }

    /// Assign the frame, invalidating the old and new regions and firing
    /// the size-changed hook. Returns true if the frame changed. The
    /// drawn bit survives the internal invalidations so an on-screen
    /// node keeps propagating later damage.
    pub(crate) fn set_frame(&mut self, id: NodeId, l: i32, t: i32, r: i32, b: i32) -> Result<bool> {
        let n = self.node(id)?;
        let new = Rect::new(l, t, r, b);
        if n.frame == new && n.flags.has_bounds {
            return Ok(false);
        }
        trace!(node = id.raw(), ?new, "set frame");
        let drawn = n.flags.drawn;
        let old_w = n.frame.width();
        let old_h = n.frame.height();

        // Damage the region we are leaving.
        self.invalidate(id)?;

        let n = self.node_mut(id)?;
        n.frame = new;
        n.flags.has_bounds = true;
        let size_changed = new.width() != old_w || new.height() != old_h;
        if size_changed {
            n.background_size_changed = true;
        }
        if n.flags.visibility == Visibility::Visible {
            // Force the drawn bit so this invalidate propagates even if
            // the node has not painted yet.
            n.flags.drawn = true;
            self.invalidate(id)?;
        }
        if size_changed {
            if let Some(res) = self.with_behavior(id, |bh, tr, id| {
                bh.size_changed(tr, id, (new.width(), new.height()), (old_w, old_h))
            }) {
                res?;
            }
        }
        self.node_mut(id)?.flags.drawn = drawn;
        Ok(true)
    }

    /// Mark a node (and its ancestors) as needing a fresh measure and
    /// layout, and flag the root dirty. Any number of calls between
    /// traversals collapse into one pass.
    pub fn request_layout(&mut self, id: NodeId) -> Result<()> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let n = self.node_mut(c)?;
            n.flags.force_layout = true;
            cur = n.parent;
        }
        let was_clean = !self.layout_requested && self.dirty.is_empty();
        self.layout_requested = true;
        if was_clean {
            self.wake();
        }
        Ok(())
    }

    /// Force the next measure of this node alone, without bubbling.
    pub fn force_layout(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.flags.force_layout = true;
        Ok(())
    }

    /// Damage a node's entire frame.
    pub fn invalidate(&mut self, id: NodeId) -> Result<()> {
        let n = self.node(id)?;
        let r = Rect::new(0, 0, n.width(), n.height());
        self.invalidate_rect(id, r)
    }

    /// Damage a region of a node, in the node's own coordinates. A node
    /// that is not currently drawn (or has never been laid out) has
    /// nothing on screen to damage, so the call short-circuits; that is
    /// what coalesces repeated invalidations into one repaint.
    pub fn invalidate_rect(&mut self, id: NodeId, rect: Rect) -> Result<()> {
        let n = self.node_mut(id)?;
        if !(n.flags.drawn && n.flags.has_bounds) {
            return Ok(());
        }
        n.flags.drawn = false;

        // Walk up composing child-to-parent translation at each level:
        // the node's offset in its parent, less the parent's scroll.
        let mut dirty = rect;
        let mut cur = id;
        while let Some(p) = self.parent_of(cur) {
            let c = self.node(cur)?;
            let (cl, ct) = (c.frame.left, c.frame.top);
            let parent = self.node_mut(p)?;
            dirty.offset(cl - parent.scroll_x, ct - parent.scroll_y);
            // Ancestors must repaint to show the damage through.
            parent.flags.drawn = false;
            cur = p;
        }
        let was_clean = !self.layout_requested && self.dirty.is_empty();
        self.dirty.union(&dirty);
        if was_clean && !self.dirty.is_empty() {
            self.wake();
        }
        Ok(())
    }

    /// Change visibility. Leaving or entering `Gone` relayouts, any hide
    /// drops focus held inside the subtree, and every transition
    /// repaints.
    pub fn set_visibility(&mut self, id: NodeId, v: Visibility) -> Result<()> {
        let n = self.node_mut(id)?;
        let old = n.flags.visibility;
        if old == v {
            return Ok(());
        }
        n.flags.visibility = v;
        match v {
            Visibility::Visible => {
                // Reappearing pixels must repaint; force the drawn bit
                // so the invalidate propagates.
                n.flags.drawn = true;
                self.invalidate(id)?;
                if old == Visibility::Gone {
                    self.request_layout(id)?;
                }
            }
            Visibility::Invisible => {
                self.invalidate(id)?;
                self.drop_focus_within(id)?;
            }
            Visibility::Gone => {
                self.request_layout(id)?;
                self.invalidate(id)?;
                self.drop_focus_within(id)?;
            }
        }
        Ok(())
    }

    fn drop_focus_within(&mut self, id: NodeId) -> Result<()> {
        if let Some(f) = self.focused {
            if self.is_ancestor_of(id, f) {
                self.clear_focus(f)?;
            }
        }
        Ok(())
    }

    /// Enable or disable a node, refreshing its visual state.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<()> {
        let n = self.node_mut(id)?;
        if n.flags.enabled == enabled {
            return Ok(());
        }
        n.flags.enabled = enabled;
        self.refresh_drawable_state(id)?;
        self.invalidate(id)
    }

    /// Set selection state, propagating to the whole subtree.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<()> {
        let n = self.node_mut(id)?;
        if n.flags.selected != selected {
            n.flags.selected = selected;
            self.invalidate(id)?;
            self.refresh_drawable_state(id)?;
        }
        for c in self.children_of(id) {
            self.set_selected(c, selected)?;
        }
        Ok(())
    }

    /// Scroll the node's content to an absolute offset.
    pub fn scroll_to(&mut self, id: NodeId, x: i32, y: i32) -> Result<()> {
        let n = self.node_mut(id)?;
        if n.scroll_x == x && n.scroll_y == y {
            return Ok(());
        }
        n.scroll_x = x;
        n.scroll_y = y;
        self.invalidate(id)
    }

    /// Scroll the node's content by a delta.
    pub fn scroll_by(&mut self, id: NodeId, dx: i32, dy: i32) -> Result<()> {
        let (x, y) = self.node(id)?.scroll();
        self.scroll_to(id, x + dx, y + dy)
    }

    /// Set padding insets; affects measurement and the clip-to-padding
    /// box.
    pub fn set_padding(&mut self, id: NodeId, padding: Insets) -> Result<()> {
        let n = self.node_mut(id)?;
        if n.padding == padding {
            return Ok(());
        }
        n.padding = padding;
        self.request_layout(id)?;
        self.invalidate(id)
    }

    /// Replace the background drawable.
    pub fn set_background(
        &mut self,
        id: NodeId,
        background: Option<Box<dyn crate::canvas::Drawable>>,
    ) -> Result<()> {
        let n = self.node_mut(id)?;
        n.background = background;
        n.background_size_changed = true;
        self.request_layout(id)?;
        self.invalidate(id)
    }

    /// Translate a rectangle from a descendant's coordinates into an
    /// ancestor's, accounting for each level's offset and scroll.
    pub fn offset_rect_to_ancestor(
        &self,
        descendant: NodeId,
        ancestor: NodeId,
        r: &mut Rect,
    ) -> Result<()> {
        let mut cur = descendant;
        while cur != ancestor {
            let n = self.node(cur)?;
            r.offset(n.frame.left - n.scroll_x, n.frame.top - n.scroll_y);
            cur = n
                .parent
                .ok_or_else(|| Error::Invalid(format!("{ancestor} is not an ancestor of {descendant}")))?;
        }
        Ok(())
    }

    /// Translate a rectangle from an ancestor's coordinates into a
    /// descendant's.
    pub fn offset_rect_from_ancestor(
        &self,
        descendant: NodeId,
        ancestor: NodeId,
        r: &mut Rect,
    ) -> Result<()> {
        let mut cur = descendant;
        while cur != ancestor {
            let n = self.node(cur)?;
            r.offset(n.scroll_x - n.frame.left, n.scroll_y - n.frame.top);
            cur = n
                .parent
                .ok_or_else(|| Error::Invalid(format!("{ancestor} is not an ancestor of {descendant}")))?;
        }
        Ok(())
    }

    /// The node's top-left corner in root (window) coordinates.
    pub fn location_in_window(&self, id: NodeId) -> Result<Point> {
        let n = self.node(id)?;
        let mut x = n.frame.left;
        let mut y = n.frame.top;
        let mut cur = n.parent;
        while let Some(p) = cur {
            let pn = self.node(p)?;
            x += pn.frame.left - pn.scroll_x;
            y += pn.frame.top - pn.scroll_y;
            cur = pn.parent;
        }
        Ok(Point::new(x, y))
    }

    /// The node's frame in root coordinates.
    pub fn window_rect(&self, id: NodeId) -> Result<Rect> {
        let loc = self.location_in_window(id)?;
        let n = self.node(id)?;
        Ok(Rect::sized(loc.x, loc.y, n.width(), n.height()))
    }
}
