//! Focus state: acquisition guards, the focused-child chain, clearing,
//! and the composite descendant-focusability policies.
//!
//! The focus chain invariant: walking `focused_child` pointers from the
//! root always reaches the node whose `focused` flag is set, and
//! [`Tree::focused`] names that same node.

use tracing::{debug, trace};

use crate::{
    error::Result,
    event::Direction,
    geom::Rect,
    node::{DescendantFocusability, NodeId, Visibility},
    tree::Tree,
};

impl Tree {
    /// Request focus with the default direction and no hint.
    pub fn request_focus(&mut self, id: NodeId) -> Result<bool> {
        self.request_focus_directional(id, Direction::Down, None)
    }

    /// Request focus, stating the direction focus travelled to get here
    /// and optionally the previously focused rectangle (in this node's
    /// coordinates) as a hint for widgets with internal selection.
    ///
    /// For composites this arbitrates between the node itself and its
    /// descendants according to the descendant-focusability policy.
    /// Returns false, with no state change, when nothing here can take
    /// focus.
    pub fn request_focus_directional(
        &mut self,
        id: NodeId,
        direction: Direction,
        hint: Option<Rect>,
    ) -> Result<bool> {
        let focusability = self
            .node(id)?
            .group_ref()
            .map(|g| g.focusability);
        match focusability {
            None | Some(DescendantFocusability::Block) => {
                self.request_focus_self(id, direction, hint)
            }
            Some(DescendantFocusability::Before) => {
                if self.request_focus_self(id, direction, hint)? {
                    Ok(true)
                } else {
                    self.focus_search_in_descendants(id, direction, hint)
                }
            }
            Some(DescendantFocusability::After) => {
                if self.focus_search_in_descendants(id, direction, hint)? {
                    Ok(true)
                } else {
                    self.request_focus_self(id, direction, hint)
                }
            }
        }
    }

    /// Try to focus this node itself, ignoring descendants.
    fn request_focus_self(
        &mut self,
        id: NodeId,
        direction: Direction,
        hint: Option<Rect>,
    ) -> Result<bool> {
        let n = self.node(id)?;
        if !n.can_take_focus(self.touch_mode) || self.has_blocking_ancestor(id) {
            return Ok(false);
        }
        self.handle_focus_gain(id, direction, hint)?;
        Ok(true)
    }

    /// Offer focus to descendants in index order (reversed for backward
    /// directions), returning true when one accepts.
    pub fn focus_search_in_descendants(
        &mut self,
        id: NodeId,
        direction: Direction,
        hint: Option<Rect>,
    ) -> Result<bool> {
        let mut children = self.children_of(id);
        if matches!(
            direction,
            Direction::Backward | Direction::Up | Direction::Left
        ) {
            children.reverse();
        }
        for c in children {
            // The list is a snapshot; tolerate mutation from callbacks.
            let Ok(n) = self.node(c) else { continue };
            if n.flags.visibility != Visibility::Visible {
                continue;
            }
            if self.request_focus_directional(c, direction, hint)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) fn has_blocking_ancestor(&self, id: NodeId) -> bool {
        let mut cur = self.parent_of(id);
        while let Some(c) = cur {
            if self
                .node(c)
                .is_ok_and(|n| n.group_ref().is_some_and(|g| {
                    g.focusability == DescendantFocusability::Block
                }))
            {
                return true;
            }
            cur = self.parent_of(c);
        }
        false
    }

    /// Grant focus unconditionally: set the flag, rewire the chain,
    /// notify. Callers have already validated eligibility.
    fn handle_focus_gain(
        &mut self,
        id: NodeId,
        direction: Direction,
        hint: Option<Rect>,
    ) -> Result<()> {
        if self.node(id)?.flags.focused {
            return Ok(());
        }
        debug!(node = id.raw(), ?direction, "focus gained");
        self.node_mut(id)?.flags.focused = true;
        self.wire_focus_chain(id)?;

        self.invalidate(id)?;
        if let Some(r) = self.with_behavior(id, |b, t, id| {
            b.focus_changed(t, id, true, Some(direction), hint)
        }) {
            r?;
        }
        self.fire_focus_listener(id, true);
        self.refresh_drawable_state(id)?;
        Ok(())
    }

    /// Point every ancestor's focused-child at the path to `focused`,
    /// unfocusing whatever branch each composite pointed at before and
    /// any ancestor that held focus itself, then record the new holder.
    /// Used on focus gain and when an added subtree brings focus with
    /// it.
    pub(crate) fn wire_focus_chain(&mut self, focused: NodeId) -> Result<()> {
        let mut child = focused;
        while let Some(p) = self.parent_of(child) {
            let old = self
                .node(p)?
                .group_ref()
                .and_then(|g| g.focused_child);
            if old != Some(child) {
                if let Some(o) = old {
                    if self.contains(o) {
                        self.unfocus(o)?;
                    }
                }
                if let Some(g) = self.node_mut(p)?.group_mut() {
                    g.focused_child = Some(child);
                }
            }
            // An ancestor holding focus itself gives it up without
            // disturbing the chain just wired beneath it.
            self.unfocus_self(p)?;
            child = p;
        }
        if let Some(old) = self.focused {
            if old != focused && self.node(old).is_ok_and(|n| n.flags.focused) {
                if self.is_ancestor_of(focused, old) {
                    // The old holder hangs below the new one: tear down
                    // the stale chain under the new holder.
                    let fc = self
                        .node(focused)?
                        .group_ref()
                        .and_then(|g| g.focused_child);
                    if let Some(fc) = fc {
                        self.unfocus(fc)?;
                        if let Some(g) = self.node_mut(focused)?.group_mut() {
                            g.focused_child = None;
                        }
                    }
                } else {
                    // A holder in a disjoint subtree is not reached by
                    // the chain walk above.
                    self.unfocus(old)?;
                }
            }
        }
        self.focused = Some(focused);
        Ok(())
    }

    /// Clear focus state throughout the focused-child chain rooted at
    /// `id`: flags, pointers, press state, with change notifications.
    pub(crate) fn unfocus(&mut self, id: NodeId) -> Result<()> {
        let focused_child = self
            .node(id)?
            .group_ref()
            .and_then(|g| g.focused_child);
        if let Some(fc) = focused_child {
            if self.contains(fc) {
                self.unfocus(fc)?;
            }
            if let Some(g) = self.node_mut(id)?.group_mut() {
                g.focused_child = None;
            }
        }
        self.unfocus_self(id)
    }

    /// Clear this node's own focused flag and notify, leaving its
    /// focused-child pointer and the chain below untouched. No-op on an
    /// unfocused node.
    fn unfocus_self(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.flags.focused {
            trace!(node = id.raw(), "focus lost");
            self.node_mut(id)?.flags.focused = false;
            if self.node(id)?.flags.pressed {
                self.set_pressed(id, false)?;
            }
            self.invalidate(id)?;
            if let Some(r) =
                self.with_behavior(id, |b, t, id| b.focus_changed(t, id, false, None, None))
            {
                r?;
            }
            self.fire_focus_listener(id, false);
            self.refresh_drawable_state(id)?;
        }
        Ok(())
    }

    /// Give up focus held by this subtree. The tree then regrants focus
    /// forward from the top, so focus never silently vanishes while a
    /// focusable node remains (the cleared node may win again if it is
    /// still the first focusable).
    pub fn clear_focus(&mut self, id: NodeId) -> Result<()> {
        let root = self.root_of(id);
        self.clear_focus_for_removal(id)?;
        let _ = self.request_focus_directional(root, Direction::Forward, None)?;
        Ok(())
    }

    /// Clear focus out of a subtree that is about to be detached,
    /// without regranting: a dying subtree must not steal focus back.
    pub(crate) fn clear_focus_for_removal(&mut self, id: NodeId) -> Result<()> {
        let mut child = id;
        while let Some(p) = self.parent_of(child) {
            if let Some(g) = self.node_mut(p)?.group_mut() {
                if g.focused_child == Some(child) {
                    g.focused_child = None;
                }
            }
            child = p;
        }
        self.unfocus(id)?;
        if let Some(f) = self.focused {
            if !self.contains(f) || self.is_ancestor_of(id, f) {
                self.focused = None;
            }
        }
        Ok(())
    }

    /// True if focus lives at or under this node.
    pub fn has_focus(&self, id: NodeId) -> bool {
        self.focused.is_some_and(|f| self.is_ancestor_of(id, f))
    }

    /// The focused node at or under `id`, if any.
    pub fn find_focus(&self, id: NodeId) -> Option<NodeId> {
        self.focused.filter(|&f| self.is_ancestor_of(id, f))
    }

    /// The chain of focused-child pointers from `from` down to the
    /// focused node, inclusive of both ends. Empty if focus is not in
    /// this subtree.
    pub fn focus_path(&self, from: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        if !self.has_focus(from) {
            return path;
        }
        let mut cur = Some(from);
        while let Some(c) = cur {
            path.push(c);
            cur = self
                .node(c)
                .ok()
                .and_then(|n| n.group_ref())
                .and_then(|g| g.focused_child);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::node::Node;

    fn two_level_tree(t: &mut Tree) -> Result<(NodeId, NodeId, NodeId, NodeId, NodeId)> {
        let root = t.insert(Node::group());
        let ba = t.insert_child(root, Node::group())?;
        let bb = t.insert_child(root, Node::group())?;
        let la = t.insert_child(ba, Node::new().focusable())?;
        let lb = t.insert_child(bb, Node::new().focusable())?;
        Ok((root, ba, bb, la, lb))
    }

    #[test]
    fn focus_chain_is_connected() -> Result<()> {
        let mut t = Tree::new();
        let (root, ba, _bb, la, _lb) = two_level_tree(&mut t)?;

        assert!(t.request_focus(la)?);
        assert_eq!(t.focused(), Some(la));
        assert!(t.node(la)?.flags.focused);

        // Walking parent pointers from the focused node, each ancestor's
        // focused-child must name the next node on the walk.
        let mut cur = la;
        while let Some(p) = t.parent_of(cur) {
            let fc = t.node(p)?.group_ref().unwrap().focused_child;
            assert_eq!(fc, Some(cur), "broken chain at {p}");
            cur = p;
        }
        assert_eq!(cur, root);
        assert_eq!(t.focus_path(root), vec![root, ba, la]);
        Ok(())
    }

    #[test]
    fn focus_transfer_unfocuses_old_branch() -> Result<()> {
        let mut t = Tree::new();
        let (root, ba, bb, la, lb) = two_level_tree(&mut t)?;

        assert!(t.request_focus(la)?);
        assert!(t.request_focus(lb)?);
        assert_eq!(t.focused(), Some(lb));
        assert!(!t.node(la)?.flags.focused);
        assert_eq!(t.node(ba)?.group_ref().unwrap().focused_child, None);
        assert_eq!(t.focus_path(root), vec![root, bb, lb]);
        Ok(())
    }

    #[test]
    fn descending_focus_into_the_focused_composite_rewires_cleanly() -> Result<()> {
        let log: Rc<RefCell<Vec<(char, bool)>>> = Rc::default();
        let (lg, ll) = (log.clone(), log.clone());

        let mut t = Tree::new();
        let g = t.insert(Node::group().focusable());
        let leaf = t.insert_child(g, Node::new().focusable())?;
        t.node_mut(g)?.listeners_mut().focus =
            Some(Box::new(move |_, _, gained| lg.borrow_mut().push(('g', gained))));
        t.node_mut(leaf)?.listeners_mut().focus =
            Some(Box::new(move |_, _, gained| ll.borrow_mut().push(('l', gained))));

        assert!(t.request_focus_directional(g, Direction::Forward, None)?);
        assert_eq!(t.focused(), Some(g));

        assert!(t.request_focus(leaf)?);
        assert_eq!(t.focused(), Some(leaf));
        assert!(t.node(leaf)?.flags.focused, "new holder keeps its flag");
        assert!(!t.node(g)?.flags.focused);
        assert_eq!(t.node(g)?.group_ref().unwrap().focused_child, Some(leaf));
        assert_eq!(t.focus_path(g), vec![g, leaf]);
        assert_eq!(
            *log.borrow(),
            vec![('g', true), ('g', false), ('l', true)],
            "one loss on the composite, one gain on the leaf"
        );
        Ok(())
    }

    #[test]
    fn focusing_an_ancestor_of_the_holder_tears_down_the_chain() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group().focusable());
        let leaf = t.insert_child(g, Node::new().focusable())?;
        assert!(t.request_focus(leaf)?);

        t.node_mut(g)?.group_mut().unwrap().focusability = DescendantFocusability::Block;
        assert!(t.request_focus_directional(g, Direction::Forward, None)?);
        assert_eq!(t.focused(), Some(g));
        assert!(t.node(g)?.flags.focused);
        assert!(!t.node(leaf)?.flags.focused);
        assert_eq!(t.node(g)?.group_ref().unwrap().focused_child, None);
        assert_eq!(t.focus_path(g), vec![g]);
        Ok(())
    }

    #[test]
    fn refusal_leaves_state_untouched() -> Result<()> {
        let mut t = Tree::new();
        let (_root, _ba, _bb, la, lb) = two_level_tree(&mut t)?;

        let plain = t.insert(Node::new());
        assert!(!t.request_focus(plain)?, "not focusable");

        t.set_visibility(la, Visibility::Invisible)?;
        assert!(!t.request_focus(la)?, "not visible");

        t.set_touch_mode(true);
        assert!(!t.request_focus(lb)?, "not focusable in touch mode");
        assert_eq!(t.focused(), None);

        t.node_mut(lb)?.flags.focusable_in_touch_mode = true;
        assert!(t.request_focus(lb)?);
        Ok(())
    }

    #[test]
    fn blocking_ancestor_denies_descendants() -> Result<()> {
        let mut t = Tree::new();
        let (_root, ba, _bb, la, _lb) = two_level_tree(&mut t)?;
        t.node_mut(ba)?.group_mut().unwrap().focusability = DescendantFocusability::Block;
        assert!(!t.request_focus(la)?);

        // Descent through the blocked composite is also cut off.
        assert!(!t.request_focus_directional(ba, Direction::Forward, None)?);
        Ok(())
    }

    #[test]
    fn before_and_after_policies() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group().focusable());
        let leaf = t.insert_child(g, Node::new().focusable())?;

        // Before: the composite wins over its descendants.
        assert!(t.request_focus_directional(g, Direction::Forward, None)?);
        assert_eq!(t.focused(), Some(g));

        t.clear_focus_for_removal(g)?;
        t.node_mut(g)?.group_mut().unwrap().focusability = DescendantFocusability::After;
        assert!(t.request_focus_directional(g, Direction::Forward, None)?);
        assert_eq!(t.focused(), Some(leaf));
        Ok(())
    }

    #[test]
    fn backward_search_visits_children_in_reverse() -> Result<()> {
        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let a = t.insert_child(g, Node::new().focusable())?;
        let b = t.insert_child(g, Node::new().focusable())?;

        assert!(t.request_focus_directional(g, Direction::Forward, None)?);
        assert_eq!(t.focused(), Some(a));
        assert!(t.request_focus_directional(g, Direction::Backward, None)?);
        assert_eq!(t.focused(), Some(b));
        Ok(())
    }

    #[test]
    fn clear_focus_regrants_forward() -> Result<()> {
        let mut t = Tree::new();
        let (_root, _ba, _bb, la, lb) = two_level_tree(&mut t)?;
        assert!(t.request_focus(lb)?);
        t.clear_focus(lb)?;
        // The first focusable forward of the top wins.
        assert_eq!(t.focused(), Some(la));
        Ok(())
    }

    #[test]
    fn removal_clears_focus_without_regrant() -> Result<()> {
        let mut t = Tree::new();
        let (root, ba, _bb, la, _lb) = two_level_tree(&mut t)?;
        assert!(t.request_focus(la)?);

        t.remove_child(root, ba)?;
        assert_eq!(t.focused(), None);
        assert_eq!(t.node(root)?.group_ref().unwrap().focused_child, None);
        // The detached subtree keeps no claim on the tree's focus.
        assert!(!t.has_focus(root));
        Ok(())
    }

    #[test]
    fn added_subtree_claims_focus_chain() -> Result<()> {
        let mut t = Tree::new();
        let root = t.insert(Node::group());
        let floater = t.insert(Node::group());
        let leaf = t.insert_child(floater, Node::new().focusable())?;
        assert!(t.request_focus(leaf)?);

        t.add_child(root, floater)?;
        assert_eq!(t.focus_path(root), vec![root, floater, leaf]);
        Ok(())
    }

    #[test]
    fn focus_listener_fires_on_gain_and_loss() -> Result<()> {
        let log: Rc<RefCell<Vec<bool>>> = Rc::default();
        let l = log.clone();

        let mut t = Tree::new();
        let g = t.insert(Node::group());
        let a = t.insert_child(g, Node::new().focusable())?;
        let b = t.insert_child(g, Node::new().focusable())?;
        t.node_mut(a)?.listeners_mut().focus =
            Some(Box::new(move |_, _, gained| l.borrow_mut().push(gained)));

        assert!(t.request_focus(a)?);
        assert!(t.request_focus(b)?);
        assert_eq!(*log.borrow(), vec![true, false]);
        Ok(())
    }
}
