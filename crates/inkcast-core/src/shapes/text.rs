//! Text note shape.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::Bounds;
use crate::sanitize::plain_text;
use crate::time::now_millis;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A text note anchored at its first baseline.
///
/// Content may carry the limited inline markup kept by
/// [`crate::sanitize::sanitize_rich`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNote {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    /// Left end of the first baseline.
    pub position: Point,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

fn default_font_size() -> f64 {
    TextNote::DEFAULT_FONT_SIZE
}

impl TextNote {
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;
    pub const MIN_FONT_SIZE: f64 = 10.0;
    pub const MAX_FONT_SIZE: f64 = 120.0;
    /// Average glyph advance as a fraction of the font size.
    pub const CHAR_WIDTH_FACTOR: f64 = 0.6;
    pub const LINE_HEIGHT_FACTOR: f64 = 1.2;
    pub const MIN_WIDTH: f64 = 20.0;

    pub fn new(
        author: impl Into<String>,
        position: Point,
        content: impl Into<String>,
        color: SerializableColor,
        font_size: f64,
    ) -> Self {
        Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            position,
            content: content.into(),
            color,
            font_size: Self::clamp_font_size(font_size),
        }
    }

    /// Clamp to the supported font range. Non-finite sizes become the default.
    pub fn clamp_font_size(size: f64) -> f64 {
        if size.is_finite() {
            size.clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE)
        } else {
            Self::DEFAULT_FONT_SIZE
        }
    }

    /// Lines of the content as laid out.
    pub fn lines(&self) -> Vec<String> {
        plain_text(&self.content)
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    /// Estimated (width, height) of the laid-out text.
    pub fn measure(&self) -> (f64, f64) {
        let lines = self.lines();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = (longest as f64 * Self::CHAR_WIDTH_FACTOR * self.font_size).max(Self::MIN_WIDTH);
        let height = lines.len().max(1) as f64 * Self::LINE_HEIGHT_FACTOR * self.font_size;
        (width, height)
    }
}

impl ShapeTrait for TextNote {
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
        let (width, height) = self.measure();
        let top = self.position.y - self.font_size;
        Bounds::from_extents(
            self.position.x,
            top,
            self.position.x + width,
            top + height,
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    fn normalize(&mut self) {
        self.font_size = Self::clamp_font_size(self.font_size);
    }
}
