//! The paint surface seam.
//!
//! The tree never rasterizes; it sequences save/clip/translate/draw
//! calls against an opaque [`Canvas`] supplied by the host, and delegates
//! pixel content to [`Drawable`] objects attached to nodes.

use crate::{drawstate::DrawState, geom::Rect};

/// An RGBA color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// An opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }
}

/// The host's 2D paint surface. Implementations maintain a save stack of
/// (clip, translation) state; the tree guarantees every `save` is paired
/// with a `restore_to_count`, including on early exits.
pub trait Canvas {
    /// Push the current clip and translation, returning a token for
    /// [`Canvas::restore_to_count`].
    fn save(&mut self) -> usize;

    /// Pop the save stack back to a token returned by [`Canvas::save`].
    fn restore_to_count(&mut self, count: usize);

    /// Translate the current coordinate space.
    fn translate(&mut self, dx: i32, dy: i32);

    /// Intersect the current clip with a rectangle in local coordinates.
    fn clip_rect(&mut self, r: Rect);

    /// Fill a rectangle with a solid color.
    fn fill_rect(&mut self, r: Rect, color: Color);
}

/// Something a node can paint: a background, an icon, a state-dependent
/// asset. Bounds are bound by the owning node before each draw.
pub trait Drawable {
    /// Paint within the currently bound bounds.
    fn draw(&mut self, canvas: &mut dyn Canvas);

    /// Bind the rectangle this drawable should fill.
    fn set_bounds(&mut self, bounds: Rect);

    /// The currently bound rectangle.
    fn bounds(&self) -> Rect;

    /// Inform the drawable of the owner's state set. Returns true if the
    /// drawable's appearance changed and the owner should repaint.
    fn set_state(&mut self, _state: &[DrawState]) -> bool {
        false
    }

    /// Intrinsic minimum width, folded into default measurement.
    fn min_width(&self) -> u32 {
        0
    }

    /// Intrinsic minimum height, folded into default measurement.
    fn min_height(&self) -> u32 {
        0
    }
}

/// A drawable that fills its bounds with a solid color.
#[derive(Debug, Default)]
pub struct ColorDrawable {
    color: Color,
    bounds: Rect,
}

impl ColorDrawable {
    /// Construct a drawable with the given fill color.
    pub fn new(color: Color) -> Self {
        Self {
            color,
            bounds: Rect::default(),
        }
    }
}

impl Drawable for ColorDrawable {
    fn draw(&mut self, canvas: &mut dyn Canvas) {
        canvas.fill_rect(self.bounds, self.color);
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }
}
