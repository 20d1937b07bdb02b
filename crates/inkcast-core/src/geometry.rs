//! Bounding boxes and distance helpers shared by hit-testing, dragging and
//! resize-handle placement.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest width/height a bounding box may report.
///
/// Keeps zero-area shapes (a single-point stroke, a horizontal line)
/// selectable and draggable.
pub const MIN_EXTENT: f64 = 8.0;

/// Default pick distance in pixels for strokes and lines.
pub const HIT_TOLERANCE: f64 = 6.0;

/// Axis-aligned bounding box of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Build bounds from extrema, flooring width and height to [`MIN_EXTENT`].
    ///
    /// A floored axis grows towards positive coordinates; the minimum corner
    /// never moves.
    pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let (min_x, max_x) = if min_x <= max_x { (min_x, max_x) } else { (max_x, min_x) };
        let (min_y, max_y) = if min_y <= max_y { (min_y, max_y) } else { (max_y, min_y) };
        let width = (max_x - min_x).max(MIN_EXTENT);
        let height = (max_y - min_y).max(MIN_EXTENT);
        Self {
            min_x,
            min_y,
            max_x: min_x + width,
            max_y: min_y + height,
            width,
            height,
        }
    }

    /// Bounds of a point cloud. An empty slice yields a minimum-sized box at
    /// the origin.
    pub fn from_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::from_extents(0.0, 0.0, 0.0, 0.0);
        };

        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;

        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Self::from_extents(min_x, min_y, max_x, max_y)
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::from_extents(rect.x0, rect.y0, rect.x1, rect.y1)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width / 2.0,
            self.min_y + self.height / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Grow the box by `amount` on every side.
    pub fn inflate(&self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
            width: self.width + 2.0 * amount,
            height: self.height + 2.0 * amount,
        }
    }

    /// True when the two boxes overlap or touch.
    pub fn intersects(&self, rect: Rect) -> bool {
        let rect = rect.abs();
        self.min_x <= rect.x1 && self.max_x >= rect.x0 && self.min_y <= rect.y1 && self.max_y >= rect.y0
    }
}

/// Distance from a point to a line segment (a→b), clamped to the segment ends.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
///
/// A single point degenerates to the point distance; an empty slice is
/// infinitely far away.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Test if any segment of the polyline intersects or lies inside a rectangle.
pub fn polyline_intersects_rect(points: &[Point], rect: Rect) -> bool {
    let rect = rect.abs();
    let inside = |p: &Point| p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1;
    if points.iter().any(inside) {
        return true;
    }
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    let edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    points.windows(2).any(|w| {
        edges
            .iter()
            .any(|&(c, d)| segments_intersect(w[0], w[1], c, d))
    })
}

/// Test if two line segments (a-b) and (c-d) intersect.
fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let cross = |o: Point, p: Point, q: Point| -> f64 {
        (p.x - o.x) * (q.y - o.y) - (p.y - o.y) * (q.x - o.x)
    };
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear: an endpoint lying on the other segment counts.
    let on_segment = |p: Point, q: Point, r: Point| -> bool {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };
    (d1.abs() < 1e-10 && on_segment(c, d, a))
        || (d2.abs() < 1e-10 && on_segment(c, d, b))
        || (d3.abs() < 1e-10 && on_segment(a, b, c))
        || (d4.abs() < 1e-10 && on_segment(a, b, d))
}
