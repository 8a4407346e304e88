//! Input event types delivered by the host input pump.

/// The direction of focus movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Move focus up.
    Up,
    /// Move focus down.
    Down,
    /// Move focus left.
    Left,
    /// Move focus right.
    Right,
    /// Move focus to the next node in tree order.
    Forward,
    /// Move focus to the previous node in tree order.
    Backward,
}

/// A key identifier, reduced to what tree navigation and default widget
/// handling care about. Hosts map their native keycodes into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Directional-pad up.
    DpadUp,
    /// Directional-pad down.
    DpadDown,
    /// Directional-pad left.
    DpadLeft,
    /// Directional-pad right.
    DpadRight,
    /// Directional-pad center (confirm).
    DpadCenter,
    /// The enter key.
    Enter,
    /// The tab key.
    Tab,
    /// A printable character.
    Char(char),
}

impl Key {
    /// The focus direction implied by this key, if any.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::DpadUp => Some(Direction::Up),
            Key::DpadDown => Some(Direction::Down),
            Key::DpadLeft => Some(Direction::Left),
            Key::DpadRight => Some(Direction::Right),
            Key::Tab => Some(Direction::Forward),
            _ => None,
        }
    }

    /// True for keys that activate (click) the focused node.
    pub fn is_confirm(self) -> bool {
        matches!(self, Key::DpadCenter | Key::Enter)
    }
}

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// The key went down.
    Down,
    /// The key came up.
    Up,
}

/// A discrete keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Press or release.
    pub action: KeyAction,
    /// Which key.
    pub key: Key,
}

impl KeyEvent {
    /// A key-down event.
    pub fn down(key: Key) -> Self {
        Self {
            action: KeyAction::Down,
            key,
        }
    }

    /// A key-up event.
    pub fn up(key: Key) -> Self {
        Self {
            action: KeyAction::Up,
            key,
        }
    }
}

/// The phase of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    /// A gesture started.
    Down,
    /// The pointer moved while down.
    Move,
    /// The gesture ended normally.
    Up,
    /// The gesture was aborted; no click should result.
    Cancel,
}

/// Window edges a pointer event started on, reported by hosts whose
/// digitizer extends past the visible surface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeFlags {
    /// Touched the top edge.
    pub top: bool,
    /// Touched the bottom edge.
    pub bottom: bool,
    /// Touched the left edge.
    pub left: bool,
    /// Touched the right edge.
    pub right: bool,
}

impl EdgeFlags {
    /// True if any edge flag is set.
    pub fn any(self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

/// A discrete pointer event in the coordinates of whichever node it is
/// currently being dispatched to. Events are `Copy`; dispatchers
/// re-locate a copy rather than mutating shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Gesture phase.
    pub action: PointerAction,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Edges the gesture started on.
    pub edge_flags: EdgeFlags,
}

impl PointerEvent {
    /// Construct an event with no edge flags.
    pub fn new(action: PointerAction, x: f32, y: f32) -> Self {
        Self {
            action,
            x,
            y,
            edge_flags: EdgeFlags::default(),
        }
    }

    /// A copy of this event at a new location.
    pub fn at(self, x: f32, y: f32) -> Self {
        Self { x, y, ..self }
    }

    /// A copy of this event translated by an offset.
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// A copy of this event with a different action.
    pub fn with_action(self, action: PointerAction) -> Self {
        Self { action, ..self }
    }
}
