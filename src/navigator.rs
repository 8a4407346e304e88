//! Directional focus navigation over window-space geometry.
//!
//! When a directional key goes unhandled by the focused subtree, the
//! root asks a navigator for the next node to focus. The navigator
//! works on flattened window rectangles, so it is independent of how
//! deeply the source and target are nested.

use crate::{
    event::Direction,
    geom::{Point, Rect},
    node::{NodeId, Visibility},
    tree::Tree,
};

/// A focusable node with its window-space rectangle.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The focusable node.
    pub id: NodeId,
    /// Its frame in window coordinates.
    pub rect: Rect,
}

/// Picks the next focus target when a directional move escapes the
/// focused subtree. Swap in a custom implementation for nonstandard
/// navigation orders.
pub trait FocusNavigator {
    /// The best node to move focus to from `from` in `direction`, or
    /// `None` when there is nothing in that direction.
    fn find_next(
        &self,
        tree: &Tree,
        root: NodeId,
        from: NodeId,
        direction: Direction,
    ) -> Option<NodeId>;
}

/// Collect every node under `root` that could take focus right now,
/// with its window rectangle. Hidden subtrees and unpositioned nodes
/// are skipped.
pub fn collect_candidates(tree: &Tree, root: NodeId) -> Vec<Candidate> {
    let mut acc = Vec::new();

    fn recurse(tree: &Tree, id: NodeId, acc: &mut Vec<Candidate>) {
        let Ok(n) = tree.node(id) else { return };
        if n.flags.visibility != Visibility::Visible {
            return;
        }
        if n.flags.has_bounds
            && n.can_take_focus(tree.in_touch_mode())
            && !tree.has_blocking_ancestor(id)
        {
            if let Ok(rect) = tree.window_rect(id) {
                acc.push(Candidate { id, rect });
            }
        }
        for c in tree.children_of(id) {
            recurse(tree, c, acc);
        }
    }

    recurse(tree, root, &mut acc);
    acc
}

/// The default navigator: beam search on rectangle centres.
///
/// For spatial directions, a candidate qualifies when its centre lies
/// strictly beyond the current centre along the axis of travel;
/// qualifiers rank by cross-axis misalignment first, then distance
/// along the direction. Forward and backward walk the collection order
/// with wraparound.
#[derive(Debug, Default)]
pub struct GeometricNavigator;

impl FocusNavigator for GeometricNavigator {
    fn find_next(
        &self,
        tree: &Tree,
        root: NodeId,
        from: NodeId,
        direction: Direction,
    ) -> Option<NodeId> {
        let candidates = collect_candidates(tree, root);
        match direction {
            Direction::Forward | Direction::Backward => {
                sequential_target(&candidates, from, direction == Direction::Forward)
            }
            _ => {
                let current = tree.window_rect(from).ok()?;
                spatial_target(current, direction, &candidates, from)
            }
        }
    }
}

fn sequential_target(candidates: &[Candidate], from: NodeId, forward: bool) -> Option<NodeId> {
    let pos = candidates.iter().position(|c| c.id == from);
    let pick = |i: usize| candidates.get(i).map(|c| c.id);
    match (pos, forward) {
        (Some(i), true) => pick((i + 1) % candidates.len()),
        (Some(i), false) => pick(i.checked_sub(1).unwrap_or(candidates.len() - 1)),
        // The source is not itself focusable (a composite delegating
        // focus, say): start from an end of the order.
        (None, true) => candidates.first().map(|c| c.id),
        (None, false) => candidates.last().map(|c| c.id),
    }
}

fn spatial_target(
    current: Rect,
    direction: Direction,
    candidates: &[Candidate],
    from: NodeId,
) -> Option<NodeId> {
    let cur_cx = current.center_x();
    let cur_cy = current.center_y();

    let mut qualifying: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.id != from)
        .filter(|c| {
            let cx = c.rect.center_x();
            let cy = c.rect.center_y();
            match direction {
                Direction::Right => cx > cur_cx,
                Direction::Left => cx < cur_cx,
                Direction::Down => cy > cur_cy,
                Direction::Up => cy < cur_cy,
                Direction::Forward | Direction::Backward => unreachable!(),
            }
        })
        .collect();

    qualifying.sort_by_key(|c| {
        let cx = c.rect.center_x();
        let cy = c.rect.center_y();
        match direction {
            Direction::Right => ((cy - cur_cy).abs(), cx - cur_cx),
            Direction::Left => ((cy - cur_cy).abs(), cur_cx - cx),
            Direction::Down => ((cx - cur_cx).abs(), cy - cur_cy),
            Direction::Up => ((cx - cur_cx).abs(), cur_cy - cy),
            Direction::Forward | Direction::Backward => unreachable!(),
        }
    });

    qualifying.first().map(|c| c.id)
}

/// The nearest touchable node to `point` lying in `direction`, used to
/// retarget pointer events that land on a window edge. Distance is
/// taken from the point to the closest corner of the candidate's
/// window rectangle.
pub fn find_nearest_touchable(
    tree: &Tree,
    root: NodeId,
    direction: Direction,
    point: Point,
) -> Option<NodeId> {
    let mut best: Option<(i64, NodeId)> = None;

    fn recurse(
        tree: &Tree,
        id: NodeId,
        direction: Direction,
        point: Point,
        best: &mut Option<(i64, NodeId)>,
    ) {
        let Ok(n) = tree.node(id) else { return };
        if n.flags.visibility != Visibility::Visible {
            return;
        }
        if n.flags.has_bounds && n.flags.enabled && (n.flags.clickable || n.flags.long_clickable) {
            if let Ok(r) = tree.window_rect(id) {
                let beyond = match direction {
                    Direction::Down => r.top >= point.y,
                    Direction::Up => r.bottom <= point.y,
                    Direction::Right => r.left >= point.x,
                    Direction::Left => r.right <= point.x,
                    Direction::Forward | Direction::Backward => true,
                };
                if beyond {
                    let dx = i64::from(point.x - point.x.clamp(r.left, r.right));
                    let dy = i64::from(point.y - point.y.clamp(r.top, r.bottom));
                    let dist = dx * dx + dy * dy;
                    if best.is_none_or(|(d, _)| dist < d) {
                        *best = Some((dist, id));
                    }
                }
            }
        }
        for c in tree.children_of(id) {
            recurse(tree, c, direction, point, best);
        }
    }

    recurse(tree, root, direction, point, &mut best);
    best.map(|(_, id)| id)
}
