//! Small geometry value types used throughout the tree.
//!
//! Coordinates are signed: node frames are parent-relative and scrolling
//! can push content into negative space.

/// A point in some coordinate space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

impl Point {
    /// Construct a new point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Edge insets, used for padding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Insets {
    /// Inset from the left edge.
    pub left: i32,
    /// Inset from the top edge.
    pub top: i32,
    /// Inset from the right edge.
    pub right: i32,
    /// Inset from the bottom edge.
    pub bottom: i32,
}

impl Insets {
    /// Construct insets from the four edges.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Uniform insets on all edges.
    pub fn uniform(v: i32) -> Self {
        Self::new(v, v, v, v)
    }
}

/// An axis-aligned rectangle, stored as edge positions. `right` and
/// `bottom` are exclusive, so `width == right - left`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// Construct a rectangle from edges.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Construct a rectangle from an origin and a size.
    pub fn sized(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    /// Width of the rectangle. Negative if the rect is inverted.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height of the rectangle. Negative if the rect is inverted.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True if the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// True if the point lies within the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Translate the rectangle in place.
    pub fn offset(&mut self, dx: i32, dy: i32) {
        self.left += dx;
        self.top += dy;
        self.right += dx;
        self.bottom += dy;
    }

    /// Grow this rectangle to also cover `other`. Empty rectangles are
    /// absorbed without effect.
    pub fn union(&mut self, other: &Rect) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
    }

    /// True if the two rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Center point along the horizontal axis.
    pub fn center_x(&self) -> i32 {
        (self.left + self.right) / 2
    }

    /// Center point along the vertical axis.
    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_basics() {
        let r = Rect::sized(10, 20, 30, 40);
        assert_eq!(r, Rect::new(10, 20, 40, 60));
        assert_eq!(r.width(), 30);
        assert_eq!(r.height(), 40);
        assert!(r.contains(10, 20));
        assert!(r.contains(39, 59));
        assert!(!r.contains(40, 20));
        assert!(!Rect::default().contains(0, 0));
    }

    #[test]
    fn union_absorbs_empty() {
        let mut r = Rect::default();
        r.union(&Rect::new(1, 2, 3, 4));
        assert_eq!(r, Rect::new(1, 2, 3, 4));
        r.union(&Rect::default());
        assert_eq!(r, Rect::new(1, 2, 3, 4));
        r.union(&Rect::new(0, 0, 2, 10));
        assert_eq!(r, Rect::new(0, 0, 3, 10));
    }

    #[test]
    fn offset_moves_all_edges() {
        let mut r = Rect::new(0, 0, 10, 10);
        r.offset(5, -5);
        assert_eq!(r, Rect::new(5, -5, 15, 5));
    }
}
