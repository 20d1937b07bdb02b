//! Shape definitions for the board.

mod circle;
mod ellipse;
mod line;
mod rectangle;
mod stroke;
mod table;
mod text;

pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;
pub use rectangle::Rectangle;
pub use stroke::Stroke;
pub use table::{Table, TableCell};
pub use text::TextNote;

use crate::geometry::{Bounds, polyline_intersects_rect};
use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for shapes.
///
/// Opaque: freshly created shapes use a v4 UUID, but ids loaded from storage
/// or received from peers are kept verbatim.
pub type ShapeId = String;

/// Generate a fresh, globally unique shape id.
pub fn new_shape_id() -> ShapeId {
    Uuid::new_v4().to_string()
}

/// Serializable color representation (RGBA8), stored as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        match digits.len() {
            3 => {
                let mut out = [0u8; 3];
                for (slot, c) in out.iter_mut().zip(digits.chars()) {
                    let v = c.to_digit(16)? as u8;
                    *slot = v * 16 + v;
                }
                Some(Self::new(out[0], out[1], out[2], 255))
            }
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<String> for SerializableColor {
    fn from(value: String) -> Self {
        Self::from_hex(&value).unwrap_or_else(|| {
            log::warn!("Unrecognized color {:?}, using black", value);
            Self::black()
        })
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Discriminant of [`Shape`], used for tag checks and log wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Stroke,
    Text,
    Table,
    Rectangle,
    Circle,
    Ellipse,
    Line,
}

impl ShapeKind {
    /// Human-readable name, as used in history descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Stroke => "stroke",
            ShapeKind::Text => "text note",
            ShapeKind::Table => "table",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
        }
    }
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> &str;

    /// Display name of the user who created the shape.
    fn author(&self) -> &str;

    /// Creation time in milliseconds since the Unix epoch.
    fn created_at(&self) -> u64;

    /// Get the bounding box in world coordinates.
    fn bounds(&self) -> Bounds;

    /// Check if a point (in world coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance).contains(point)
    }

    /// Move the shape by `delta`.
    fn translate(&mut self, delta: Vec2);

    /// Repair out-of-range or structurally incomplete fields.
    fn normalize(&mut self) {}
}

/// A drawable entity on the board.
///
/// The `kind` tag never changes after creation; updates replace fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Shape {
    Stroke(Stroke),
    #[serde(rename = "text-note")]
    Text(TextNote),
    Table(Table),
    Rectangle(Rectangle),
    Circle(Circle),
    Ellipse(Ellipse),
    Line(Line),
}

impl Shape {
    pub fn id(&self) -> &str {
        match self {
            Shape::Stroke(s) => s.id(),
            Shape::Text(s) => s.id(),
            Shape::Table(s) => s.id(),
            Shape::Rectangle(s) => s.id(),
            Shape::Circle(s) => s.id(),
            Shape::Ellipse(s) => s.id(),
            Shape::Line(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Stroke(_) => ShapeKind::Stroke,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Table(_) => ShapeKind::Table,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Line(_) => ShapeKind::Line,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Shape::Stroke(s) => s.author(),
            Shape::Text(s) => s.author(),
            Shape::Table(s) => s.author(),
            Shape::Rectangle(s) => s.author(),
            Shape::Circle(s) => s.author(),
            Shape::Ellipse(s) => s.author(),
            Shape::Line(s) => s.author(),
        }
    }

    pub fn created_at(&self) -> u64 {
        match self {
            Shape::Stroke(s) => s.created_at(),
            Shape::Text(s) => s.created_at(),
            Shape::Table(s) => s.created_at(),
            Shape::Rectangle(s) => s.created_at(),
            Shape::Circle(s) => s.created_at(),
            Shape::Ellipse(s) => s.created_at(),
            Shape::Line(s) => s.created_at(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Shape::Stroke(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Table(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Circle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Line(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Stroke(s) => s.hit_test(point, tolerance),
            Shape::Text(s) => s.hit_test(point, tolerance),
            Shape::Table(s) => s.hit_test(point, tolerance),
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Circle(s) => s.hit_test(point, tolerance),
            Shape::Ellipse(s) => s.hit_test(point, tolerance),
            Shape::Line(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Stroke(s) => s.translate(delta),
            Shape::Text(s) => s.translate(delta),
            Shape::Table(s) => s.translate(delta),
            Shape::Rectangle(s) => s.translate(delta),
            Shape::Circle(s) => s.translate(delta),
            Shape::Ellipse(s) => s.translate(delta),
            Shape::Line(s) => s.translate(delta),
        }
    }

    pub fn normalize(&mut self) {
        match self {
            Shape::Stroke(s) => s.normalize(),
            Shape::Text(s) => s.normalize(),
            Shape::Table(s) => s.normalize(),
            Shape::Rectangle(s) => s.normalize(),
            Shape::Circle(s) => s.normalize(),
            Shape::Ellipse(s) => s.normalize(),
            Shape::Line(s) => s.normalize(),
        }
    }

    /// Consume and return the normalized shape.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Test if this shape intersects a selection rectangle.
    /// Strokes and lines test their segments; other kinds their bounds.
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        match self {
            Shape::Stroke(s) => polyline_intersects_rect(&s.points, rect),
            Shape::Line(l) => polyline_intersects_rect(&[l.start, l.end], rect),
            _ => self.bounds().intersects(rect),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Shape::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNote> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Shape::Stroke(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Stroke> for Shape {
    fn from(s: Stroke) -> Self {
        Shape::Stroke(s)
    }
}

impl From<TextNote> for Shape {
    fn from(s: TextNote) -> Self {
        Shape::Text(s)
    }
}

impl From<Table> for Shape {
    fn from(s: Table) -> Self {
        Shape::Table(s)
    }
}

impl From<Rectangle> for Shape {
    fn from(s: Rectangle) -> Self {
        Shape::Rectangle(s)
    }
}

impl From<Circle> for Shape {
    fn from(s: Circle) -> Self {
        Shape::Circle(s)
    }
}

impl From<Ellipse> for Shape {
    fn from(s: Ellipse) -> Self {
        Shape::Ellipse(s)
    }
}

impl From<Line> for Shape {
    fn from(s: Line) -> Self {
        Shape::Line(s)
    }
}
