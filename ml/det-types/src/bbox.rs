//! Normalized box geometry used by every post-processing stage.

use serde::{Deserialize, Serialize};

/// A normalized axis-aligned box.
///
/// Coordinates are normalized to `[0, 1]` relative to frame dimensions.
/// Format is `[x0, y0, x1, y1]` (left, top, right, bottom). The ordering
/// `x0 <= x1`, `y0 <= y1` is expected but not enforced; box merges may
/// violate it transiently.
///
/// # Example
///
/// ```
/// use det_types::BoundingBox;
///
/// let bbox = BoundingBox::new(0.1, 0.2, 0.5, 0.6);
///
/// assert!((bbox.width() - 0.4).abs() < 1e-6);
/// assert!((bbox.height() - 0.4).abs() < 1e-6);
/// assert!((bbox.area() - 0.16).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (x0), normalized to `[0, 1]`.
    pub x0: f32,
    /// Top edge (y0), normalized to `[0, 1]`.
    pub y0: f32,
    /// Right edge (x1), normalized to `[0, 1]`.
    pub x1: f32,
    /// Bottom edge (y1), normalized to `[0, 1]`.
    pub y1: f32,
}

impl BoundingBox {
    /// Creates a new box from its edges.
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Creates a box from an array `[x0, y0, x1, y1]`.
    #[must_use]
    pub const fn from_array(coords: [f32; 4]) -> Self {
        Self {
            x0: coords[0],
            y0: coords[1],
            x1: coords[2],
            y1: coords[3],
        }
    }

    /// Returns the box as an array `[x0, y0, x1, y1]`.
    #[must_use]
    pub const fn as_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Returns the box width (normalized).
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Returns the box height (normalized).
    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Returns the box area (normalized).
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns the center point `(cx, cy)`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn center(&self) -> (f32, f32) {
        (
            f32::midpoint(self.x0, self.x1),
            f32::midpoint(self.y0, self.y1),
        )
    }

    /// Checks if the box coordinates are valid.
    ///
    /// Valid means: in range `[0, 1]` and `x0 <= x1`, `y0 <= y1`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        in_range(self.x0)
            && in_range(self.y0)
            && in_range(self.x1)
            && in_range(self.y1)
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }

    /// Returns the area of the overlap with another box.
    #[must_use]
    #[allow(clippy::similar_names)]
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let inter_x0 = self.x0.max(other.x0);
        let inter_y0 = self.y0.max(other.y0);
        let inter_x1 = self.x1.min(other.x1);
        let inter_y1 = self.y1.min(other.y1);

        let inter_w = (inter_x1 - inter_x0).max(0.0);
        let inter_h = (inter_y1 - inter_y0).max(0.0);
        inter_w * inter_h
    }

    /// Computes the intersection-over-union (`IoU`) with another box.
    ///
    /// Returns a value in `[0, 1]` where 1 means perfect overlap.
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let inter_area = self.intersection_area(other);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Computes the intersection over the smaller of the two areas (`IoMA`).
    ///
    /// A small box fully inside a large one scores 1 here while its `IoU`
    /// stays low. Returns 0 when either box is degenerate.
    #[must_use]
    pub fn ioma(&self, other: &Self) -> f32 {
        let min_area = self.area().min(other.area());
        if min_area > 0.0 {
            self.intersection_area(other) / min_area
        } else {
            0.0
        }
    }

    /// Checks if this box contains a point (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Clamps coordinates to valid range `[0, 1]`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn clamped(&self) -> Self {
        Self {
            x0: self.x0.clamp(0.0, 1.0),
            y0: self.y0.clamp(0.0, 1.0),
            x1: self.x1.clamp(0.0, 1.0),
            y1: self.y1.clamp(0.0, 1.0),
        }
    }

    /// Blends each coordinate as `t * self + (1 - t) * other`.
    ///
    /// `t = 1` returns `self`, `t = 0` returns `other`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| t.mul_add(a, (1.0 - t) * b);
        Self {
            x0: mix(self.x0, other.x0),
            y0: mix(self.y0, other.y0),
            x1: mix(self.x1, other.x1),
            y1: mix(self.y1, other.y1),
        }
    }

    /// Returns the smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grows the box to include a point.
    #[must_use]
    pub fn include_point(&self, x: f32, y: f32) -> Self {
        Self {
            x0: self.x0.min(x),
            y0: self.y0.min(y),
            x1: self.x1.max(x),
            y1: self.y1.max(y),
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(coords: [f32; 4]) -> Self {
        Self::from_array(coords)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.as_array()
    }
}
