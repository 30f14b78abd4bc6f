#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Coordinates are screen pixels as reported by the host windowing system.
//! Floating windows, pointer positions and drop-indicator bounds all share
//! this space.

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise displacement from `origin` to `self`.
    #[inline]
    pub fn delta_from(self, origin: Self) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }

    /// Translate by a delta.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle used for window bounds and hit regions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from an origin and a size.
    #[inline]
    pub const fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Top-left corner.
    #[inline]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if the rectangle has zero (or negative) area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same size, moved so the origin sits at `origin`.
    #[inline]
    #[must_use]
    pub fn with_origin(self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(29.9, 14.9)));
        assert!(!rect.contains(Point::new(30.0, 12.0)));
        assert!(!rect.contains(Point::new(12.0, 15.0)));
    }

    #[test]
    fn center_and_edges() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        assert_eq!(rect.center(), Point::new(20.0, 10.0));
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.bottom(), 20.0);
    }

    #[test]
    fn zero_area_is_empty() {
        assert!(Rect::new(5.0, 5.0, 0.0, 10.0).is_empty());
        assert!(!Rect::new(5.0, 5.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn delta_is_signed() {
        let origin = Point::new(100.0, 50.0);
        assert_eq!(Point::new(90.0, 60.0).delta_from(origin), (-10.0, 10.0));
    }

    #[test]
    fn with_origin_keeps_size() {
        let moved = Rect::new(1.0, 2.0, 3.0, 4.0).with_origin(Point::new(9.0, 9.0));
        assert_eq!(moved, Rect::new(9.0, 9.0, 3.0, 4.0));
        assert_eq!(moved.size(), Size::new(3.0, 4.0));
    }
}
