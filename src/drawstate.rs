//! Drawable state derivation.
//!
//! A node's interactive condition is summarized as a state set that its
//! background drawable (and widget drawables) select a representation
//! from. The sets for every combination of the four core bits are
//! precomputed in a fixed table so derivation is a single index.

use tracing::trace;

use crate::{
    error::Result,
    node::NodeId,
    tree::Tree,
};

/// One element of a drawable state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawState {
    /// The node is enabled.
    Enabled,
    /// The node holds focus.
    Focused,
    /// The node is selected.
    Selected,
    /// The node is currently pressed.
    Pressed,
}

use DrawState::*;

/// All sixteen state sets, indexed by
/// `pressed << 3 | enabled << 2 | focused << 1 | selected`.
const DRAW_STATE_SETS: [&[DrawState]; 16] = [
    &[],                                     // 0 0 0 0
    &[Selected],                             // 0 0 0 1
    &[Focused],                              // 0 0 1 0
    &[Focused, Selected],                    // 0 0 1 1
    &[Enabled],                              // 0 1 0 0
    &[Enabled, Selected],                    // 0 1 0 1
    &[Enabled, Focused],                     // 0 1 1 0
    &[Enabled, Focused, Selected],           // 0 1 1 1
    &[Pressed],                              // 1 0 0 0
    &[Pressed, Selected],                    // 1 0 0 1
    &[Pressed, Focused],                     // 1 0 1 0
    &[Pressed, Focused, Selected],           // 1 0 1 1
    &[Pressed, Enabled],                     // 1 1 0 0
    &[Pressed, Enabled, Selected],           // 1 1 0 1
    &[Pressed, Enabled, Focused],            // 1 1 1 0
    &[Pressed, Enabled, Focused, Selected],  // 1 1 1 1
];

/// Look up the precomputed state set for a flag combination.
pub fn draw_state_set(
    pressed: bool,
    enabled: bool,
    focused: bool,
    selected: bool,
) -> &'static [DrawState] {
    let idx = (pressed as usize) << 3
        | (enabled as usize) << 2
        | (focused as usize) << 1
        | (selected as usize);
    DRAW_STATE_SETS[idx]
}

/// Append additional states to a base set, for widgets that extend the
/// core vocabulary via the extra-space mechanism.
pub fn merge_state_sets(base: &mut Vec<DrawState>, additional: &[DrawState]) {
    base.extend_from_slice(additional);
}

impl Tree {
    /// Derive the drawable state set for a node, with room reserved for
    /// `extra_space` additional entries a widget behavior may append. A
    /// node that duplicates its parent's state reports the parent's set
    /// instead of its own.
    pub fn create_drawable_state(&self, id: NodeId, extra_space: usize) -> Result<Vec<DrawState>> {
        let n = self.node(id)?;
        if n.flags.duplicate_parent_state {
            if let Some(p) = n.parent {
                return self.create_drawable_state(p, extra_space);
            }
        }
        let set = draw_state_set(
            n.flags.pressed,
            n.flags.enabled,
            n.flags.focused,
            n.flags.selected,
        );
        let mut v = Vec::with_capacity(set.len() + extra_space);
        v.extend_from_slice(set);
        Ok(v)
    }

    /// Recompute a node's drawable state and push it into the background
    /// drawable, invalidating if the drawable reports a visual change.
    /// Children that duplicate this node's state are refreshed too.
    pub fn refresh_drawable_state(&mut self, id: NodeId) -> Result<()> {
        let state = self.create_drawable_state(id, 0)?;
        let n = self.node_mut(id)?;
        if n.drawable_state == state {
            return Ok(());
        }
        trace!(node = id.raw(), ?state, "drawable state changed");
        n.drawable_state = state.clone();
        let mut changed = false;
        if let Some(bg) = n.background.as_mut() {
            changed = bg.set_state(&state);
        }
        if changed {
            self.invalidate(id)?;
        }
        for child in self.children_of(id) {
            if self.node(child).is_ok_and(|c| c.flags.duplicate_parent_state) {
                self.refresh_drawable_state(child)?;
            }
        }
        Ok(())
    }
}
