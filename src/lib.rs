//! A retained-mode UI node tree: measurement, layout, drawing, focus,
//! and input dispatch over a host-provided canvas and event source.
//!
//! The tree is built from [`Node`]s held in an arena [`Tree`] and
//! addressed by copyable [`NodeId`] handles. Composites own children
//! and arbitrate focus and pointer capture; leaves paint content.
//! Widget-specific behavior attaches through the [`Behavior`] trait
//! rather than subclassing. A [`Root`] binds the tree to a host window
//! and runs the traversal state machine.
//!
//! The crate never talks to a windowing system. Hosts feed it resize,
//! key, and pointer events, poll [`Root::needs_frame`], and hand it a
//! [`Canvas`] to paint on.

// Core modules
pub mod canvas;
pub mod drawstate;
pub mod error;
pub mod event;
pub mod geom;
pub mod measure;
pub mod navigator;
pub mod node;
pub mod root;
pub mod sched;
pub mod tree;

// Tree operation layers: these extend `Tree` with inherent impls.
mod dispatch;
mod draw;
mod focus;
mod layout;

#[cfg(test)]
pub mod tutils;

// Public exports
pub use canvas::{Canvas, Color, ColorDrawable, Drawable};
pub use dispatch::TOUCH_SLOP;
pub use drawstate::DrawState;
pub use error::{Error, Result};
pub use event::{
    Direction, EdgeFlags, Key, KeyAction, KeyEvent, PointerAction, PointerEvent,
};
pub use geom::{Insets, Point, Rect};
pub use measure::{LayoutParams, Margins, MeasureSpec, SizePolicy, SpecMode};
pub use navigator::{FocusNavigator, GeometricNavigator};
pub use node::{
    Behavior, DescendantFocusability, Flags, Node, NodeId, Visibility,
};
pub use root::Root;
pub use sched::{Scheduler, TaskId};
pub use tree::Tree;
