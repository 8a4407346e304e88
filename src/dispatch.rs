//! Input dispatch: key events down the focus chain, pointer events down
//! the hit-tested capture chain, and the built-in press machine.
//!
//! Dispatch never errors for "nothing handled it": every entry point
//! returns whether the event was consumed and the caller decides on
//! fallback.

use tracing::{debug, trace};

use crate::{
    error::Result,
    event::{KeyAction, KeyEvent, PointerAction, PointerEvent},
    node::{NodeId, Visibility},
    tree::Tree,
};

/// How far outside its bounds a pressed node tracks a moving pointer
/// before dropping the press.
pub const TOUCH_SLOP: f32 = 5.0;

impl Tree {
    /// Dispatch a key event into the subtree at `id`. Composites route
    /// to themselves when focused, else to their focused child; either
    /// path requires valid bounds, otherwise the event is dropped.
    pub fn dispatch_key(&mut self, id: NodeId, event: &KeyEvent) -> Result<bool> {
        let n = self.node(id)?;
        if let Some(g) = n.group_ref() {
            if n.flags.focused && n.flags.has_bounds {
                return self.dispatch_key_self(id, event);
            }
            if let Some(fc) = g.focused_child {
                if self.node(fc).is_ok_and(|c| c.flags.has_bounds) {
                    return self.dispatch_key(fc, event);
                }
            }
            trace!(node = id.raw(), "key dropped: no laid-out focus path");
            return Ok(false);
        }
        self.dispatch_key_self(id, event)
    }

    /// Offer the event to this node: listener first (enabled nodes
    /// only), then the behavior hook, then built-in key handling.
    fn dispatch_key_self(&mut self, id: NodeId, event: &KeyEvent) -> Result<bool> {
        if self.node(id)?.flags.enabled && self.offer_key_listener(id, event) {
            return Ok(true);
        }
        if let Some(r) = self.with_behavior(id, |b, t, id| b.key(t, id, event)) {
            if r? {
                return Ok(true);
            }
        }
        match event.action {
            KeyAction::Down => self.on_key_down(id, event),
            KeyAction::Up => self.on_key_up(id, event),
        }
    }

    /// Built-in key-down handling: a confirm key presses a clickable
    /// node. Disabled nodes eat confirm keys without reacting.
    fn on_key_down(&mut self, id: NodeId, event: &KeyEvent) -> Result<bool> {
        if !event.key.is_confirm() {
            return Ok(false);
        }
        let n = self.node(id)?;
        if !n.flags.enabled {
            return Ok(true);
        }
        if n.flags.clickable {
            self.set_pressed(id, true)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Built-in key-up handling: releasing a confirm key on a still-
    /// pressed clickable node performs the click.
    fn on_key_up(&mut self, id: NodeId, event: &KeyEvent) -> Result<bool> {
        if !event.key.is_confirm() {
            return Ok(false);
        }
        let n = self.node(id)?;
        if !n.flags.enabled {
            return Ok(true);
        }
        if n.flags.clickable {
            let was_pressed = n.flags.pressed;
            self.set_pressed(id, false)?;
            if was_pressed {
                self.perform_click(id);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Dispatch a pointer event into the subtree at `id`, in `id`'s own
    /// coordinates.
    pub fn dispatch_pointer(&mut self, id: NodeId, event: PointerEvent) -> Result<bool> {
        if self.node(id)?.is_group() {
            self.dispatch_pointer_group(id, event)
        } else {
            self.dispatch_pointer_self(id, event)
        }
    }

    /// The composite pointer algorithm: hit-test and capture on DOWN,
    /// route to the motion target afterward, honoring interception.
    fn dispatch_pointer_group(&mut self, id: NodeId, event: PointerEvent) -> Result<bool> {
        let action = event.action;
        let (sx, sy) = self.node(id)?.scroll();
        // Child hit-testing happens in this node's content space, which
        // the scroll offset shifts.
        let scrolled_x = event.x + sx as f32;
        let scrolled_y = event.y + sy as f32;
        let disallow = self
            .node(id)?
            .group_ref()
            .map(|g| g.disallow_intercept)
            .unwrap_or(false);

        if action == PointerAction::Down {
            // A stale target from an interrupted gesture is dropped.
            if let Some(g) = self.node_mut(id)?.group_mut() {
                g.motion_target = None;
            }
            if disallow || !self.intercept_pointer(id, &event) {
                let xi = scrolled_x.floor() as i32;
                let yi = scrolled_y.floor() as i32;
                // Front-most children are last in paint order, so the
                // hit test walks back to front.
                for c in self.children_of(id).into_iter().rev() {
                    let Ok(n) = self.node(c) else { continue };
                    if n.flags.visibility != Visibility::Visible {
                        continue;
                    }
                    if !n.hit_rect().contains(xi, yi) {
                        continue;
                    }
                    let (cl, ct) = (n.left(), n.top());
                    let ev = event.at(scrolled_x - cl as f32, scrolled_y - ct as f32);
                    if self.dispatch_pointer(c, ev)? {
                        debug!(group = id.raw(), target = c.raw(), "pointer captured");
                        if let Some(g) = self.node_mut(id)?.group_mut() {
                            g.motion_target = Some(c);
                        }
                        return Ok(true);
                    }
                }
            }
        }

        let up_or_cancel =
            matches!(action, PointerAction::Up | PointerAction::Cancel);
        if up_or_cancel {
            if let Some(g) = self.node_mut(id)?.group_mut() {
                g.disallow_intercept = false;
            }
        }

        let target = self
            .node(id)?
            .group_ref()
            .and_then(|g| g.motion_target)
            .filter(|&t| self.contains(t));
        let Some(target) = target else {
            // No capture: the composite handles the event itself.
            return self.dispatch_pointer_self(id, event);
        };

        if !disallow && self.intercept_pointer(id, &event) {
            // Claiming mid-gesture: the target sees a synthesized CANCEL
            // and the composite owns the rest of the stream.
            let f = self.node(target)?.frame();
            let cancel = event
                .with_action(PointerAction::Cancel)
                .at(scrolled_x - f.left as f32, scrolled_y - f.top as f32);
            if !self.dispatch_pointer(target, cancel)? {
                trace!(target = target.raw(), "motion target ignored CANCEL");
            }
            if let Some(g) = self.node_mut(id)?.group_mut() {
                g.motion_target = None;
            }
            return Ok(true);
        }

        if up_or_cancel {
            if let Some(g) = self.node_mut(id)?.group_mut() {
                g.motion_target = None;
            }
        }

        let f = self.node(target)?.frame();
        let ev = event.at(scrolled_x - f.left as f32, scrolled_y - f.top as f32);
        self.dispatch_pointer(target, ev)
    }

    /// Offer the event to this node: listener first (enabled nodes
    /// only), then the behavior hook, then the built-in press machine.
    fn dispatch_pointer_self(&mut self, id: NodeId, event: PointerEvent) -> Result<bool> {
        if self.node(id)?.flags.enabled && self.offer_touch_listener(id, &event) {
            return Ok(true);
        }
        if let Some(r) = self.with_behavior(id, |b, t, id| b.pointer(t, id, &event)) {
            if r? {
                return Ok(true);
            }
        }
        self.on_pointer_event(id, event)
    }

    /// The built-in press machine. A disabled clickable node consumes
    /// the gesture without reacting.
    fn on_pointer_event(&mut self, id: NodeId, event: PointerEvent) -> Result<bool> {
        let n = self.node(id)?;
        if !n.flags.enabled {
            return Ok(n.flags.clickable);
        }
        if !n.flags.clickable {
            return Ok(false);
        }
        match event.action {
            PointerAction::Down => {
                self.set_pressed(id, true)?;
            }
            PointerAction::Move => {
                let w = n.width() as f32;
                let h = n.height() as f32;
                let outside = event.x < -TOUCH_SLOP
                    || event.x >= w + TOUCH_SLOP
                    || event.y < -TOUCH_SLOP
                    || event.y >= h + TOUCH_SLOP;
                if outside && n.flags.pressed {
                    self.set_pressed(id, false)?;
                }
            }
            PointerAction::Up => {
                if n.flags.pressed {
                    self.set_pressed(id, false)?;
                    self.perform_click(id);
                }
            }
            PointerAction::Cancel => {
                self.set_pressed(id, false)?;
            }
        }
        Ok(true)
    }

    /// Set the press flag, refreshing visual state and propagating to
    /// children that duplicate this node's state.
    pub fn set_pressed(&mut self, id: NodeId, pressed: bool) -> Result<()> {
        let n = self.node_mut(id)?;
        if n.flags.pressed == pressed {
            return Ok(());
        }
        n.flags.pressed = pressed;
        self.refresh_drawable_state(id)?;
        for c in self.children_of(id) {
            if self.node(c).is_ok_and(|n| n.flags.duplicate_parent_state) {
                self.set_pressed(c, pressed)?;
            }
        }
        Ok(())
    }

    /// Invoke the click listener. Returns true if one was attached.
    pub fn perform_click(&mut self, id: NodeId) -> bool {
        trace!(node = id.raw(), "click");
        self.fire_click(id)
    }

    /// Invoke the long-click listener. Returns true if one was attached
    /// and consumed the gesture.
    pub fn perform_long_click(&mut self, id: NodeId) -> bool {
        self.fire_long_click(id)
    }

    /// Latch (or release) intercept suppression on this composite and
    /// every ancestor, for the remainder of the current gesture.
    pub fn request_disallow_intercept(&mut self, id: NodeId, disallow: bool) -> Result<()> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(g) = self.node_mut(c)?.group_mut() {
                g.disallow_intercept = disallow;
            }
            cur = self.parent_of(c);
        }
        Ok(())
    }

    fn intercept_pointer(&mut self, id: NodeId, event: &PointerEvent) -> bool {
        self.with_behavior(id, |b, t, id| b.intercept_pointer(t, id, event))
            .unwrap_or(false)
    }

    fn offer_key_listener(&mut self, id: NodeId, event: &KeyEvent) -> bool {
        let Some(mut l) = self
            .node_mut(id)
            .ok()
            .and_then(|n| n.listeners.key.take())
        else {
            return false;
        };
        let consumed = l(self, id, event);
        if let Ok(n) = self.node_mut(id) {
            if n.listeners.key.is_none() {
                n.listeners.key = Some(l);
            }
        }
        consumed
    }

    fn offer_touch_listener(&mut self, id: NodeId, event: &PointerEvent) -> bool {
        let Some(mut l) = self
            .node_mut(id)
            .ok()
            .and_then(|n| n.listeners.touch.take())
        else {
            return false;
        };
        let consumed = l(self, id, event);
        if let Ok(n) = self.node_mut(id) {
            if n.listeners.touch.is_none() {
                n.listeners.touch = Some(l);
            }
        }
        consumed
    }
}
