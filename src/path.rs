use crate::math::{polygon_2d::signed_area_2d, Point2};

/// Winding direction of a closed path.
///
/// Traced contours use positive (counter-clockwise) winding for outer
/// boundaries and negative winding for holes, so nested regions survive
/// the trip through triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    CounterClockwise,
    Clockwise,
}

/// An ordered sequence of 2D points describing the boundary of a filled
/// region.
#[derive(Debug, Clone, Default)]
pub struct Path {
    /// Boundary points in order. The last point connects back to the first
    /// when `closed` is true.
    pub points: Vec<Point2>,
    /// Whether the path forms a closed loop.
    pub closed: bool,
}

impl Path {
    /// Creates a closed path from boundary points.
    #[must_use]
    pub fn closed(points: Vec<Point2>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    /// Signed area enclosed by the path (zero for open paths).
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        if self.closed {
            signed_area_2d(&self.points)
        } else {
            0.0
        }
    }

    /// Winding direction derived from the signed area.
    #[must_use]
    pub fn winding(&self) -> Winding {
        if self.signed_area() >= 0.0 {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        }
    }

    /// Reverses the point order, flipping the winding.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Axis-aligned bounding box as `(min, max)`, or `None` if empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Point2, Point2)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }

    /// A path with fewer than 3 distinct points encloses nothing.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }
}
