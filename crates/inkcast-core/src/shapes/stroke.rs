//! Freehand stroke shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::{Bounds, point_to_polyline_dist};
use crate::time::now_millis;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A freehand stroke made of connected points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    /// Points along the path, in drawing order.
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_stroke_width() -> f64 {
    Stroke::DEFAULT_WIDTH
}

impl Stroke {
    /// Fewest points a stroke needs to be committed.
    pub const MIN_POINTS: usize = 2;

    pub const DEFAULT_WIDTH: f64 = 3.0;

    pub fn new(
        author: impl Into<String>,
        points: Vec<Point>,
        color: SerializableColor,
        stroke_width: f64,
    ) -> Self {
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            points,
            color,
            stroke_width,
        }
    }

    /// True when the stroke has enough points to be committed.
    pub fn is_committable(&self) -> bool {
        self.points.len() >= Self::MIN_POINTS
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl ShapeTrait for Stroke {
    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &str {
        &self.created_by
    }

    fn created_at(&self) -> u64 {
        self.created_at
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= tolerance + self.stroke_width / 2.0
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }

    fn normalize(&mut self) {
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            self.stroke_width = Self::DEFAULT_WIDTH;
        }
    }
}
