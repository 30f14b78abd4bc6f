#![forbid(unsafe_code)]

//! Drag-start thresholding.
//!
//! A press only becomes a drag once the pointer has travelled further than
//! the configured distance on either axis. This keeps clicks on tab headers
//! from accidentally starting a docking gesture.

use crate::geometry::Point;

/// Default horizontal drag distance in pixels.
pub const DEFAULT_DRAG_THRESHOLD_X: f64 = 4.0;

/// Default vertical drag distance in pixels.
pub const DEFAULT_DRAG_THRESHOLD_Y: f64 = 4.0;

/// Per-axis minimum displacement before a press turns into a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragThreshold {
    pub x: f64,
    pub y: f64,
}

impl DragThreshold {
    /// Create a threshold, clamping negative or non-finite values to zero.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        let sanitize = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
        Self {
            x: sanitize(x),
            y: sanitize(y),
        }
    }

    /// True when `current` is strictly further than the threshold from
    /// `origin` on at least one axis.
    #[must_use]
    pub fn exceeded(&self, origin: Point, current: Point) -> bool {
        let (dx, dy) = current.delta_from(origin);
        dx.abs() > self.x || dy.abs() > self.y
    }
}

impl Default for DragThreshold {
    fn default() -> Self {
        Self {
            x: DEFAULT_DRAG_THRESHOLD_X,
            y: DEFAULT_DRAG_THRESHOLD_Y,
        }
    }
}
