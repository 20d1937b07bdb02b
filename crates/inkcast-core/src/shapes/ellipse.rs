//! Ellipse shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::Bounds;
use crate::time::now_millis;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// An axis-aligned ellipse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ellipse {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    pub center: Point,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_stroke_width() -> f64 {
    2.0
}

impl Ellipse {
    pub fn new(
        author: impl Into<String>,
        center: Point,
        radius_x: f64,
        radius_y: f64,
        color: SerializableColor,
        stroke_width: f64,
    ) -> Self {
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            center,
            radius_x: radius_x.abs(),
            radius_y: radius_y.abs(),
            color,
            stroke_width,
        }
    }

    /// Create an ellipse inscribed in a bounding rectangle.
    pub fn from_rect(author: impl Into<String>, rect: Rect, color: SerializableColor, stroke_width: f64) -> Self {
        let rect = rect.abs();
        Self::new(
            author,
            rect.center(),
            rect.width() / 2.0,
            rect.height() / 2.0,
            color,
            stroke_width,
        )
    }
}

impl ShapeTrait for Ellipse {
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
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }

    fn normalize(&mut self) {
        self.radius_x = self.radius_x.abs();
        self.radius_y = self.radius_y.abs();
    }
}
