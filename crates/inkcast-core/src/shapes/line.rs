//! Straight line shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::{Bounds, point_to_segment_dist};
use crate::time::now_millis;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A straight line segment between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_stroke_width() -> f64 {
    2.0
}

impl Line {
    pub fn new(author: impl Into<String>, start: Point, end: Point, color: SerializableColor, stroke_width: f64) -> Self {
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            start,
            end,
            color,
            stroke_width,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

impl ShapeTrait for Line {
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
        Bounds::from_points(&[self.start, self.end])
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= tolerance + self.stroke_width / 2.0
    }

    fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
    }
}
