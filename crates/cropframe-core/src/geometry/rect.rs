//! Axis-aligned rectangles and points in viewport coordinates.

use serde::{Deserialize, Serialize};

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle stored as edges, matching how the viewport,
/// crop window and image bounds are reported to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// Rectangle from its four edges.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from its top-left corner and size.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Create a rectangle of the given size centered on `center`.
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    /// Smallest rectangle containing every point.
    ///
    /// Returns an empty rectangle at the origin for an empty slice.
    pub fn bounding(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().skip(1).fold(
            Self::new(first.x, first.y, first.x, first.y),
            |acc, p| Self::new(acc.left.min(p.x), acc.top.min(p.y), acc.right.max(p.x), acc.bottom.max(p.y)),
        )
    }

    /// Horizontal extent; negative for an inverted rect.
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical extent; negative for an inverted rect.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Midpoint of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Area, or zero when the rect is empty.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when the rectangle has no positive area (or is not finite).
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0) || !self.is_finite()
    }

    /// True when every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// Corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    /// Whether `other` lies inside `self`, allowing `tolerance` on every edge.
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        other.left >= self.left - tolerance
            && other.top >= self.top - tolerance
            && other.right <= self.right + tolerance
            && other.bottom <= self.bottom + tolerance
    }

    /// Whether `point` lies inside `self`, allowing `tolerance` on every edge.
    pub fn contains_point(&self, point: Point, tolerance: f64) -> bool {
        point.x >= self.left - tolerance
            && point.x <= self.right + tolerance
            && point.y >= self.top - tolerance
            && point.y <= self.bottom + tolerance
    }

    /// Overlapping region of two rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!rect.is_empty()).then_some(rect)
    }

    /// The same rect moved by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Largest per-edge distance between two rectangles.
    pub fn max_edge_delta(&self, other: &Rect) -> f64 {
        (self.left - other.left)
            .abs()
            .max((self.top - other.top).abs())
            .max((self.right - other.right).abs())
            .max((self.bottom - other.bottom).abs())
    }

    /// Interpolate between two rectangles for crop-window animations.
    ///
    /// Each edge moves by the integer part of `(end - start) * fraction`, so
    /// intermediate frames land on whole-pixel offsets from `start`.
    pub fn lerp(start: &Rect, end: &Rect, fraction: f64) -> Rect {
        let step = |from: f64, to: f64| from + ((to - from) * fraction).trunc();
        Rect::new(
            step(start.left, end.left),
            step(start.top, end.top),
            step(start.right, end.right),
            step(start.bottom, end.bottom),
        )
    }
}
