//! Circle shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::Bounds;
use crate::time::now_millis;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    pub center: Point,
    pub radius: f64,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_stroke_width() -> f64 {
    2.0
}

impl Circle {
    pub fn new(author: impl Into<String>, center: Point, radius: f64, color: SerializableColor, stroke_width: f64) -> Self {
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            center,
            radius: radius.abs(),
            color,
            stroke_width,
        }
    }
}

impl ShapeTrait for Circle {
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
        Bounds::from_extents(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }

    fn normalize(&mut self) {
        self.radius = self.radius.abs();
    }
}
