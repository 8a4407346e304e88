//! The arena that owns every node, and the structural operations that
//! are the only legal way to mutate parent/child relationships.
//!
//! Nodes live in generation-checked slots; [`NodeId`] handles are
//! copyable and validated on every access, so parent, focused-child and
//! motion-target references can be stored without ownership cycles.

use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    geom::Rect,
    measure::LayoutParams,
    node::{Behavior, Node, NodeId},
};

/// One arena slot. The generation increments on free, invalidating any
/// outstanding handles to the previous occupant.
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The node arena and tree-wide state. All tree semantics (layout,
/// drawing, focus, dispatch) are methods on this type, implemented in
/// their own modules.
#[derive(Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// The node currently holding focus, if any.
    pub(crate) focused: Option<NodeId>,
    /// Whether the last interaction came from a pointer. Gates the
    /// focusable-in-touch-mode rule.
    pub(crate) touch_mode: bool,
    /// Coalesced layout request; cleared by the next traversal.
    pub(crate) layout_requested: bool,
    /// Coalesced dirty region in root coordinates.
    pub(crate) dirty: Rect,
    /// Host notification fired on the clean-to-dirty edge.
    pub(crate) waker: Option<Box<dyn FnMut()>>,
}

impl Tree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the host callback fired when the tree first becomes
    /// dirty after a clean traversal.
    pub fn set_frame_waker(&mut self, waker: Box<dyn FnMut()>) {
        self.waker = Some(waker);
    }

    /// True if a layout pass has been requested since the last
    /// traversal.
    pub fn is_layout_requested(&self) -> bool {
        self.layout_requested
    }

    /// The node currently holding focus.
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Whether the focusable-in-touch-mode rule is active.
    pub fn in_touch_mode(&self) -> bool {
        self.touch_mode
    }

    /// Set touch mode. Hosts typically toggle this on the first pointer
    /// interaction; tests set it directly.
    pub fn set_touch_mode(&mut self, on: bool) {
        self.touch_mode = on;
    }

    /// Take and reset the coalesced dirty region.
    pub fn take_dirty(&mut self) -> Rect {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn wake(&mut self) {
        if let Some(w) = self.waker.as_mut() {
            w();
        }
    }

    /// Place a detached node into the arena, returning its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// True if the handle refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|s| s.generation == id.generation && s.node.is_some())
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or_else(|| Error::Dangling(id.to_string()))
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or_else(|| Error::Dangling(id.to_string()))
    }

    /// The parent of a node, if it is attached and alive.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// A snapshot of a node's children. Snapshotting (rather than
    /// borrowing) is what lets dispatch tolerate structural mutation
    /// from inside callbacks.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .ok()
            .and_then(|n| n.group.as_ref())
            .map(|g| g.children.clone())
            .unwrap_or_default()
    }

    /// The subtree rooted at `id` in preorder, as a snapshot.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.contains(cur) {
                continue;
            }
            out.push(cur);
            let children = self.children_of(cur);
            for c in children.into_iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    /// Walk to the top of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.parent_of(cur) {
            cur = p;
        }
        cur
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent_of(c);
        }
        false
    }

    /// Find a node by tag in the subtree rooted at `from`.
    pub fn find_by_tag(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        self.preorder(from)
            .into_iter()
            .find(|&id| self.node(id).is_ok_and(|n| n.tag.as_deref() == Some(tag)))
    }

    /// Append a child to a composite. See [`Tree::add_child_at`].
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.add_child_full(parent, child, None, None)
    }

    /// Insert a child at an index. See [`Tree::add_child_full`].
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.add_child_full(parent, child, Some(index), None)
    }

    /// Insert and attach a fresh node in one step, appending it to the
    /// parent's children.
    pub fn insert_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
        let id = self.insert(node);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Attach `child` to `parent`, assigning layout params (defaults if
    /// absent) and inserting at `index` (append if `None`). If the child
    /// subtree already contains the focused node, the focus chain is
    /// wired up through this composite.
    ///
    /// # Panics
    ///
    /// Panics if the child already has a parent, if the parent is not a
    /// composite, or if `index` is out of range.
    pub fn add_child_full(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
        params: Option<LayoutParams>,
    ) -> Result<()> {
        let c = self.node_mut(child)?;
        assert!(
            c.parent.is_none(),
            "node {child} already has a parent; remove it first"
        );
        if let Some(p) = params {
            c.layout_params = p;
        }
        c.parent = Some(parent);

        let p = self.node_mut(parent)?;
        let g = p
            .group
            .as_mut()
            .unwrap_or_else(|| panic!("node {parent} is not a composite"));
        let at = index.unwrap_or(g.children.len());
        assert!(
            at <= g.children.len(),
            "child index {at} out of range for node {parent}"
        );
        g.children.insert(at, child);
        trace!(parent = parent.raw(), child = child.raw(), at, "add child");

        self.fire_hierarchy(parent, child, true);

        // An added subtree that already holds focus claims the focus
        // chain through its new ancestors.
        if let Some(f) = self.focused {
            if self.is_ancestor_of(child, f) {
                self.wire_focus_chain(f)?;
            }
        }

        self.request_layout(parent)?;
        self.invalidate(parent)?;
        Ok(())
    }

    /// Detach `child` from `parent`, returning false if it was not a
    /// child. The node stays alive in the arena; drop it with
    /// [`Tree::remove_subtree`] or re-add it elsewhere. If the removed
    /// subtree held focus, focus is cleared up to the surviving
    /// ancestors.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let Some(pos) = self.children_of(parent).iter().position(|&c| c == child) else {
            return Ok(false);
        };
        self.remove_child_at(parent, pos)?;
        Ok(true)
    }

    /// Detach the child at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let children = self.children_of(parent);
        assert!(
            index < children.len(),
            "child index {index} out of range for node {parent}"
        );
        let child = children[index];

        // A dying subtree must not pull focus back; clear it silently
        // up to the surviving ancestors first.
        if let Some(f) = self.focused {
            if self.is_ancestor_of(child, f) {
                self.clear_focus_for_removal(child)?;
            }
        }

        if let Some(g) = self.node_mut(parent)?.group.as_mut() {
            if let Some(pos) = g.children.iter().position(|&c| c == child) {
                g.children.remove(pos);
            }
            if g.focused_child == Some(child) {
                g.focused_child = None;
            }
            if g.motion_target == Some(child) {
                g.motion_target = None;
            }
        }
        if let Ok(c) = self.node_mut(child) {
            c.parent = None;
        }
        debug!(parent = parent.raw(), child = child.raw(), "remove child");

        self.fire_hierarchy(parent, child, false);
        self.request_layout(parent)?;
        self.invalidate(parent)?;
        Ok(child)
    }

    /// Detach `count` children starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the child list.
    pub fn remove_children(&mut self, parent: NodeId, start: usize, count: usize) -> Result<()> {
        let len = self.node(parent)?.child_count();
        assert!(
            start + count <= len,
            "child range {start}..{} out of range for node {parent}",
            start + count
        );
        for _ in 0..count {
            self.remove_child_at(parent, start)?;
        }
        Ok(())
    }

    /// Detach all children of a composite.
    pub fn remove_all_children(&mut self, parent: NodeId) -> Result<()> {
        let count = self.node(parent)?.child_count();
        self.remove_children(parent, 0, count)
    }

    /// Remove a node and its entire subtree from the arena, detaching it
    /// from its parent first if necessary. All handles into the subtree
    /// become stale.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<()> {
        if let Some(p) = self.parent_of(id) {
            self.remove_child(p, id)?;
        } else if let Some(f) = self.focused {
            // Detached subtrees can still hold focus state.
            if self.is_ancestor_of(id, f) {
                self.clear_focus_for_removal(id)?;
            }
        }
        for n in self.preorder(id) {
            let slot = &mut self.slots[n.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(n.index);
        }
        Ok(())
    }

    /// Detach a child from the array without focus or layout side
    /// effects, for callers that will immediately re-attach it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn detach_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let g = self
            .node_mut(parent)?
            .group
            .as_mut()
            .unwrap_or_else(|| panic!("node {parent} is not a composite"));
        assert!(
            index < g.children.len(),
            "child index {index} out of range for node {parent}"
        );
        let child = g.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(child)
    }

    /// Re-attach a child detached with [`Tree::detach_child_at`].
    ///
    /// # Panics
    ///
    /// Panics if the child already has a parent or `index` is out of
    /// range.
    pub fn attach_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        let c = self.node_mut(child)?;
        assert!(
            c.parent.is_none(),
            "node {child} already has a parent; remove it first"
        );
        c.parent = Some(parent);
        let g = self
            .node_mut(parent)?
            .group
            .as_mut()
            .unwrap_or_else(|| panic!("node {parent} is not a composite"));
        assert!(
            index <= g.children.len(),
            "child index {index} out of range for node {parent}"
        );
        g.children.insert(index, child);
        Ok(())
    }

    /// Move a child to the front of the paint order (last index).
    pub fn bring_child_to_front(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let g = self
            .node_mut(parent)?
            .group
            .as_mut()
            .ok_or_else(|| Error::Invalid(format!("node {parent} is not a composite")))?;
        if let Some(pos) = g.children.iter().position(|&c| c == child) {
            g.children.remove(pos);
            g.children.push(child);
            self.request_layout(parent)?;
            self.invalidate(parent)?;
        }
        Ok(())
    }

    /// Run a node's behavior hook, if it has one. The behavior box is
    /// removed for the duration of the call so the hook can mutate the
    /// tree (including its own node), and restored afterward if the slot
    /// is still alive and empty. Returns `None` when there is no
    /// behavior to run.
    pub(crate) fn with_behavior<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Behavior, &mut Self, NodeId) -> R,
    ) -> Option<R> {
        let mut b = self.node_mut(id).ok()?.behavior.take()?;
        let r = f(b.as_mut(), self, id);
        if let Ok(n) = self.node_mut(id) {
            if n.behavior.is_none() {
                n.behavior = Some(b);
            }
        }
        Some(r)
    }

    /// Fire a node's click listener, if attached.
    pub(crate) fn fire_click(&mut self, id: NodeId) -> bool {
        let Some(mut l) = self
            .node_mut(id)
            .ok()
            .and_then(|n| n.listeners.click.take())
        else {
            return false;
        };
        l(self, id);
        if let Ok(n) = self.node_mut(id) {
            if n.listeners.click.is_none() {
                n.listeners.click = Some(l);
            }
        }
        true
    }

    /// Fire a node's long-click listener, if attached.
    pub(crate) fn fire_long_click(&mut self, id: NodeId) -> bool {
        let Some(mut l) = self
            .node_mut(id)
            .ok()
            .and_then(|n| n.listeners.long_click.take())
        else {
            return false;
        };
        let consumed = l(self, id);
        if let Ok(n) = self.node_mut(id) {
            if n.listeners.long_click.is_none() {
                n.listeners.long_click = Some(l);
            }
        }
        consumed
    }

    /// Fire a node's focus-change listener, if attached.
    pub(crate) fn fire_focus_listener(&mut self, id: NodeId, gained: bool) {
        let Some(mut l) = self
            .node_mut(id)
            .ok()
            .and_then(|n| n.listeners.focus.take())
        else {
            return;
        };
        l(self, id, gained);
        if let Ok(n) = self.node_mut(id) {
            if n.listeners.focus.is_none() {
                n.listeners.focus = Some(l);
            }
        }
    }

    /// Fire a composite's hierarchy-change listener, if attached.
    pub(crate) fn fire_hierarchy(&mut self, parent: NodeId, child: NodeId, added: bool) {
        let Some(mut l) = self
            .node_mut(parent)
            .ok()
            .and_then(|n| n.listeners.hierarchy.take())
        else {
            return;
        };
        l(self, parent, child, added);
        if let Ok(n) = self.node_mut(parent) {
            if n.listeners.hierarchy.is_none() {
                n.listeners.hierarchy = Some(l);
            }
        }
    }
}
