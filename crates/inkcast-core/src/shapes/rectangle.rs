//! Rectangle shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::Bounds;
use crate::time::now_millis;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

fn default_stroke_width() -> f64 {
    2.0
}

impl Rectangle {
    pub fn new(author: impl Into<String>, rect: Rect, color: SerializableColor, stroke_width: f64) -> Self {
        let rect = rect.abs();
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            color,
            stroke_width,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    pub fn from_corners(author: impl Into<String>, p1: Point, p2: Point, color: SerializableColor, stroke_width: f64) -> Self {
        Self::new(author, Rect::from_points(p1, p2), color, stroke_width)
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Replace the geometry with `rect`, normalized.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }
}

impl ShapeTrait for Rectangle {
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
        Bounds::from_rect(self.as_rect())
    }

    fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    fn normalize(&mut self) {
        self.set_rect(self.as_rect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_from_corners() {
        let rect = Rectangle::from_corners(
            "ana",
            Point::new(100.0, 100.0),
            Point::new(50.0, 60.0),
            SerializableColor::black(),
            2.0,
        );
        assert!((rect.x - 50.0).abs() < f64::EPSILON);
        assert!((rect.y - 60.0).abs() < f64::EPSILON);
        assert!((rect.width - 50.0).abs() < f64::EPSILON);
        assert!((rect.height - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let rect = Rectangle::new("ana", Rect::new(0.0, 0.0, 100.0, 100.0), SerializableColor::black(), 2.0);
        assert!(rect.hit_test(Point::new(50.0, 50.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 50.0), 0.0));
        assert!(rect.hit_test(Point::new(105.0, 50.0), 10.0));
    }

    #[test]
    fn test_negative_size_normalizes() {
        let mut rect = Rectangle::new("ana", Rect::new(0.0, 0.0, 10.0, 10.0), SerializableColor::black(), 2.0);
        rect.x = 50.0;
        rect.width = -20.0;
        rect.normalize();
        assert!((rect.x - 30.0).abs() < f64::EPSILON);
        assert!((rect.width - 20.0).abs() < f64::EPSILON);
    }
}
