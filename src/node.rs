//! The node value type: geometry, flags, listeners, and the widget seam.
//!
//! A [`Node`] is a plain value owned by the [`Tree`] arena. It carries no
//! behavior of its own beyond accessors; every operation with tree-wide
//! side effects (measurement, invalidation, focus, dispatch) lives on
//! [`Tree`] and is keyed by [`NodeId`].

use crate::{
    canvas::{Canvas, Drawable},
    drawstate::DrawState,
    error::Result,
    event::{Direction, KeyEvent, PointerEvent},
    geom::{Insets, Rect},
    measure::{LayoutParams, MeasureSpec},
    tree::Tree,
};

/// A copyable handle to a node slot in the arena. Handles are validated
/// by generation on every access, so a handle to a removed node yields
/// an error rather than aliasing whatever reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// A compact form for logging.
    pub fn raw(self) -> u64 {
        (self.generation as u64) << 32 | self.index as u64
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Node visibility.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Drawn and occupies layout space.
    #[default]
    Visible,
    /// Not drawn, but still occupies layout space.
    Invisible,
    /// Not drawn and takes no layout space.
    Gone,
}

/// How a composite arbitrates focus between itself and its descendants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescendantFocusability {
    /// Try to focus the composite itself before its descendants.
    #[default]
    Before,
    /// Try the descendants first, the composite only as a fallback.
    After,
    /// Descendants are unreachable; only the composite may take focus.
    Block,
}

/// The per-node flag set, as named members rather than packed bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    /// Visibility state.
    pub visibility: Visibility,
    /// Whether the node reacts to input.
    pub enabled: bool,
    /// Whether the node may take focus.
    pub focusable: bool,
    /// Whether the node may take focus while the tree is in touch mode.
    pub focusable_in_touch_mode: bool,
    /// Whether the node consumes clicks.
    pub clickable: bool,
    /// Whether the node consumes long clicks.
    pub long_clickable: bool,
    /// In-flight press state.
    pub pressed: bool,
    /// Selection state.
    pub selected: bool,
    /// Whether the node currently holds focus.
    pub focused: bool,
    /// Whether the node derives drawable state from its parent instead
    /// of its own flags.
    pub duplicate_parent_state: bool,
    /// Whether the node draws no content of its own. Composites default
    /// to true; a background still paints.
    pub will_not_draw: bool,
    /// Set once the node has been positioned by at least one layout.
    pub(crate) has_bounds: bool,
    /// Set when the node's current pixels are on screen; cleared by
    /// invalidation.
    pub(crate) drawn: bool,
    /// Forces the next measure to run even with unchanged specs.
    pub(crate) force_layout: bool,
    /// Set by measure; makes the next layout run its hook even when the
    /// frame is unchanged.
    pub(crate) layout_required: bool,
    /// Contract bit: the measure hook must set measured dimensions.
    pub(crate) measured_dimension_set: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            visibility: Visibility::Visible,
            enabled: true,
            focusable: false,
            focusable_in_touch_mode: false,
            clickable: false,
            long_clickable: false,
            pressed: false,
            selected: false,
            focused: false,
            duplicate_parent_state: false,
            will_not_draw: false,
            has_bounds: false,
            drawn: false,
            // A fresh node has never been measured.
            force_layout: true,
            layout_required: false,
            measured_dimension_set: false,
        }
    }
}

/// The composite capability: present on nodes that own children.
#[derive(Default)]
pub struct Group {
    /// Children in paint and hit-test order; the frontmost child is the
    /// last element.
    pub(crate) children: Vec<NodeId>,
    /// The child on the focus path, if any.
    pub(crate) focused_child: Option<NodeId>,
    /// The child that captured the in-flight pointer gesture.
    pub(crate) motion_target: Option<NodeId>,
    /// Latch set by descendants to suppress interception for the rest of
    /// the current gesture.
    pub(crate) disallow_intercept: bool,
    /// Whether children are clipped to their own bounds when drawn.
    pub clip_children: bool,
    /// Whether child drawing is clipped to this node's padding box.
    pub clip_to_padding: bool,
    /// Focus arbitration between this node and its descendants.
    pub focusability: DescendantFocusability,
}

impl Group {
    fn new() -> Self {
        Self {
            clip_children: true,
            clip_to_padding: true,
            ..Self::default()
        }
    }
}

/// Called when this node's click fires.
pub type ClickListener = Box<dyn FnMut(&mut Tree, NodeId)>;
/// Called on long click; returns true if consumed.
pub type LongClickListener = Box<dyn FnMut(&mut Tree, NodeId) -> bool>;
/// Offered key events before default handling; returns true if consumed.
pub type KeyListener = Box<dyn FnMut(&mut Tree, NodeId, &KeyEvent) -> bool>;
/// Offered pointer events before default handling; returns true if
/// consumed.
pub type TouchListener = Box<dyn FnMut(&mut Tree, NodeId, &PointerEvent) -> bool>;
/// Called when focus is gained (true) or lost (false).
pub type FocusListener = Box<dyn FnMut(&mut Tree, NodeId, bool)>;
/// Called on a composite when a child is added (true) or removed
/// (false).
pub type HierarchyListener = Box<dyn FnMut(&mut Tree, NodeId, NodeId, bool)>;

/// The optional listener set. Each listener is invoked at most once per
/// triggering event and may mutate the tree re-entrantly: the box is
/// taken out of the node for the duration of the call.
#[derive(Default)]
pub struct Listeners {
    /// Click callback.
    pub click: Option<ClickListener>,
    /// Long-click callback.
    pub long_click: Option<LongClickListener>,
    /// Key callback, offered events before default handling.
    pub key: Option<KeyListener>,
    /// Touch callback, offered events before default handling.
    pub touch: Option<TouchListener>,
    /// Focus-change callback.
    pub focus: Option<FocusListener>,
    /// Hierarchy-change callback (composites only).
    pub hierarchy: Option<HierarchyListener>,
}

/// The widget seam: strategy hooks a node may attach instead of the
/// built-in defaults. Hooks receive the tree and the node's own id; the
/// behavior box is removed from the node while a hook runs, so hooks may
/// freely mutate the tree, including the node itself.
#[allow(unused_variables)]
pub trait Behavior {
    /// Compute and set measured dimensions for the given constraints.
    ///
    /// Implementations must call [`Tree::set_measured_dimension`] (the
    /// default resolves intrinsic minimums against the specs); failing
    /// to do so is a contract violation and panics in the caller.
    fn measure(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Result<()> {
        tree.measure_default(id, width_spec, height_spec)
    }

    /// Position children after this node's frame has been assigned.
    /// `changed` is true when the frame differs from the previous one.
    fn arrange(&mut self, tree: &mut Tree, id: NodeId, changed: bool, frame: Rect) -> Result<()> {
        Ok(())
    }

    /// Paint this node's own content, after the background and before
    /// children.
    fn draw_content(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        canvas: &mut dyn Canvas,
    ) -> Result<()> {
        Ok(())
    }

    /// Paint decorations over children (scroll indicators and the like).
    fn draw_decorations(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        canvas: &mut dyn Canvas,
    ) -> Result<()> {
        Ok(())
    }

    /// Handle a key event after listeners refuse it. Return true to
    /// consume; false falls through to the built-in confirm-key
    /// handling.
    fn key(&mut self, tree: &mut Tree, id: NodeId, event: &KeyEvent) -> Result<bool> {
        Ok(false)
    }

    /// Handle a pointer event after listeners refuse it. Return true to
    /// consume; false falls through to the built-in press machine.
    fn pointer(&mut self, tree: &mut Tree, id: NodeId, event: &PointerEvent) -> Result<bool> {
        Ok(false)
    }

    /// Composite hook: claim the in-flight gesture from the motion
    /// target. The event is in this node's coordinates.
    fn intercept_pointer(&mut self, tree: &mut Tree, id: NodeId, event: &PointerEvent) -> bool {
        false
    }

    /// Composite hook: map a paint-order iteration index to a child
    /// index, for custom draw ordering.
    fn child_draw_order(&self, child_count: usize, i: usize) -> usize {
        i
    }

    /// Notification that the node's size changed during layout.
    fn size_changed(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        new: (i32, i32),
        old: (i32, i32),
    ) -> Result<()> {
        Ok(())
    }

    /// Root-level escalation when a directional move found no target.
    /// Return true if the move was absorbed.
    fn unhandled_move(&mut self, tree: &mut Tree, id: NodeId, direction: Direction) -> Result<bool> {
        Ok(false)
    }

    /// Notification that the node gained or lost focus. On gain,
    /// `previously_focused` (when known) is the old focus rectangle in
    /// this node's coordinates, so widgets with internal selection can
    /// land it adjacent to where focus left.
    fn focus_changed(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        gained: bool,
        direction: Option<Direction>,
        previously_focused: Option<Rect>,
    ) -> Result<()> {
        Ok(())
    }
}

/// One element of the tree. Construct with [`Node::new`] or
/// [`Node::group`], configure with the chainable `with_*` methods, then
/// insert into a [`Tree`].
#[derive(Default)]
pub struct Node {
    /// Optional identifying tag, searchable via [`Tree::find_by_tag`].
    pub(crate) tag: Option<String>,
    pub(crate) parent: Option<NodeId>,
    /// Frame in parent coordinates.
    pub(crate) frame: Rect,
    pub(crate) scroll_x: i32,
    pub(crate) scroll_y: i32,
    pub(crate) padding: Insets,
    pub(crate) measured_width: u32,
    pub(crate) measured_height: u32,
    /// The specs the node was last measured with, for the measure
    /// fast path.
    pub(crate) old_width_spec: Option<MeasureSpec>,
    pub(crate) old_height_spec: Option<MeasureSpec>,
    pub(crate) min_width: u32,
    pub(crate) min_height: u32,
    pub(crate) layout_params: LayoutParams,
    /// Named flag set.
    pub flags: Flags,
    pub(crate) background: Option<Box<dyn Drawable>>,
    /// Set when the frame size changes, so the background's bounds are
    /// re-bound on the next draw.
    pub(crate) background_size_changed: bool,
    /// Cached drawable state, maintained by
    /// [`Tree::refresh_drawable_state`].
    pub(crate) drawable_state: Vec<DrawState>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) listeners: Listeners,
    pub(crate) group: Option<Group>,
}

impl Node {
    /// A new detached leaf node.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new detached composite node. Composites default to painting no
    /// content of their own.
    pub fn group() -> Self {
        Self {
            group: Some(Group::new()),
            flags: Flags {
                will_not_draw: true,
                ..Flags::default()
            },
            ..Self::default()
        }
    }

    /// Attach an identifying tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach a background drawable.
    pub fn with_background(mut self, d: Box<dyn Drawable>) -> Self {
        self.background = Some(d);
        self.background_size_changed = true;
        self
    }

    /// Attach a behavior strategy.
    pub fn with_behavior(mut self, b: Box<dyn Behavior>) -> Self {
        self.behavior = Some(b);
        self
    }

    /// Set the layout request read by the parent.
    pub fn with_layout_params(mut self, p: LayoutParams) -> Self {
        self.layout_params = p;
        self
    }

    /// Set intrinsic minimum dimensions for default measurement.
    pub fn with_min_size(mut self, width: u32, height: u32) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    /// Mark the node focusable.
    pub fn focusable(mut self) -> Self {
        self.flags.focusable = true;
        self
    }

    /// Mark the node focusable in touch mode (implies focusable).
    pub fn focusable_in_touch_mode(mut self) -> Self {
        self.flags.focusable = true;
        self.flags.focusable_in_touch_mode = true;
        self
    }

    /// Mark the node clickable.
    pub fn clickable(mut self) -> Self {
        self.flags.clickable = true;
        self
    }

    /// The node's tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The parent handle, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The frame in parent coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Left edge of the frame.
    pub fn left(&self) -> i32 {
        self.frame.left
    }

    /// Top edge of the frame.
    pub fn top(&self) -> i32 {
        self.frame.top
    }

    /// Laid-out width.
    pub fn width(&self) -> i32 {
        self.frame.width()
    }

    /// Laid-out height.
    pub fn height(&self) -> i32 {
        self.frame.height()
    }

    /// Current scroll offsets.
    pub fn scroll(&self) -> (i32, i32) {
        (self.scroll_x, self.scroll_y)
    }

    /// Padding insets.
    pub fn padding(&self) -> Insets {
        self.padding
    }

    /// Width set by the most recent measure pass. Valid only after
    /// measurement.
    pub fn measured_width(&self) -> u32 {
        self.measured_width
    }

    /// Height set by the most recent measure pass. Valid only after
    /// measurement.
    pub fn measured_height(&self) -> u32 {
        self.measured_height
    }

    /// The node's layout request.
    pub fn layout_params(&self) -> LayoutParams {
        self.layout_params
    }

    /// The hit rectangle in parent coordinates.
    pub fn hit_rect(&self) -> Rect {
        self.frame
    }

    /// True if the node is a composite.
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// Number of children; zero for leaves.
    pub fn child_count(&self) -> usize {
        self.group.as_ref().map_or(0, |g| g.children.len())
    }

    /// The composite capability, if present.
    pub fn group_ref(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    /// Mutable access to the composite capability, if present.
    pub fn group_mut(&mut self) -> Option<&mut Group> {
        self.group.as_mut()
    }

    /// Mutable access to the listener set.
    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    /// True if the node can currently take focus: focusable, visible,
    /// and focusable in touch mode when the tree is in touch mode.
    pub(crate) fn can_take_focus(&self, touch_mode: bool) -> bool {
        self.flags.focusable
            && self.flags.visibility == Visibility::Visible
            && (!touch_mode || self.flags.focusable_in_touch_mode)
    }
}
