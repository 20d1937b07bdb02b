//! Selection handles and drag/resize manipulation.

use crate::geometry::Bounds;
use crate::shapes::{Shape, ShapeTrait, Table, TextNote};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 10.0;

/// Resized boxes never collapse below this size.
const MIN_RESIZE: f64 = 1.0;

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandleKind {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Line start point.
    Start,
    /// Line end point.
    End,
}

impl HandleKind {
    /// Parse the kebab-case handle name used by the UI layer.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top-left" => Some(Self::TopLeft),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-right" => Some(Self::BottomRight),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    pub fn is_corner(&self) -> bool {
        !matches!(self, Self::Start | Self::End)
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in world coordinates) hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Get the selection handles for a shape.
pub fn get_handles(shape: &Shape) -> Vec<Handle> {
    match shape {
        Shape::Line(line) => vec![
            Handle::new(line.start, HandleKind::Start),
            Handle::new(line.end, HandleKind::End),
        ],
        _ => corner_handles(&shape.bounds()),
    }
}

fn corner_handles(bounds: &Bounds) -> Vec<Handle> {
    vec![
        Handle::new(Point::new(bounds.min_x, bounds.min_y), HandleKind::TopLeft),
        Handle::new(Point::new(bounds.max_x, bounds.min_y), HandleKind::TopRight),
        Handle::new(Point::new(bounds.min_x, bounds.max_y), HandleKind::BottomLeft),
        Handle::new(Point::new(bounds.max_x, bounds.max_y), HandleKind::BottomRight),
    ]
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(shape: &Shape, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(shape)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.kind)
}

/// Apply a handle manipulation to a shape and return the modified copy.
///
/// `None` moves the whole shape by `delta`. A handle that does not apply to
/// the shape kind leaves it unchanged.
pub fn apply_manipulation(shape: &Shape, handle: Option<HandleKind>, delta: Vec2) -> Shape {
    let mut shape = shape.clone();

    let Some(handle) = handle else {
        shape.translate(delta);
        return shape;
    };

    match (&mut shape, handle) {
        (Shape::Line(line), HandleKind::Start) => line.start += delta,
        (Shape::Line(line), HandleKind::End) => line.end += delta,
        (Shape::Line(_), _) => {}
        (_, HandleKind::Start | HandleKind::End) => {}
        (Shape::Rectangle(rect), corner) => {
            let (x0, y0, x1, y1) = resized_box(&rect.bounds(), corner, delta);
            rect.x = x0;
            rect.y = y0;
            rect.width = x1 - x0;
            rect.height = y1 - y0;
        }
        (Shape::Ellipse(ellipse), corner) => {
            let (x0, y0, x1, y1) = resized_box(&ellipse.bounds(), corner, delta);
            ellipse.center = Point::new((x0 + x1) / 2.0, (y0 + y1) / 2.0);
            ellipse.radius_x = (x1 - x0) / 2.0;
            ellipse.radius_y = (y1 - y0) / 2.0;
        }
        (Shape::Circle(circle), corner) => {
            let (x0, y0, x1, y1) = resized_box(&circle.bounds(), corner, delta);
            circle.center = Point::new((x0 + x1) / 2.0, (y0 + y1) / 2.0);
            circle.radius = (x1 - x0).max(y1 - y0) / 2.0;
        }
        (Shape::Stroke(stroke), _) if stroke.points.is_empty() => {}
        (Shape::Stroke(stroke), corner) => {
            let bounds = stroke.bounds();
            let (x0, y0, x1, y1) = resized_box(&bounds, corner, delta);
            let scale_x = (x1 - x0) / bounds.width;
            let scale_y = (y1 - y0) / bounds.height;
            for point in &mut stroke.points {
                point.x = x0 + (point.x - bounds.min_x) * scale_x;
                point.y = y0 + (point.y - bounds.min_y) * scale_y;
            }
        }
        (Shape::Text(text), corner) => resize_text(text, corner, delta),
        (Shape::Table(table), corner) => resize_table(table, corner, delta),
    }

    shape
}

/// Move one corner of `bounds` by `delta`, keeping the opposite corner fixed.
/// Returns normalized `(x0, y0, x1, y1)`.
fn resized_box(bounds: &Bounds, corner: HandleKind, delta: Vec2) -> (f64, f64, f64, f64) {
    let (mut x0, mut y0, mut x1, mut y1) = (bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y);
    match corner {
        HandleKind::TopLeft => {
            x0 += delta.x;
            y0 += delta.y;
        }
        HandleKind::TopRight => {
            x1 += delta.x;
            y0 += delta.y;
        }
        HandleKind::BottomLeft => {
            x0 += delta.x;
            y1 += delta.y;
        }
        HandleKind::BottomRight | HandleKind::Start | HandleKind::End => {
            x1 += delta.x;
            y1 += delta.y;
        }
    }
    let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
    let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
    (x0, y0, x0 + (x1 - x0).max(MIN_RESIZE), y0 + (y1 - y0).max(MIN_RESIZE))
}

/// Text scales its font size with the box height.
fn resize_text(text: &mut TextNote, corner: HandleKind, delta: Vec2) {
    let bounds = text.bounds();
    let (x0, y0, _, y1) = resized_box(&bounds, corner, delta);
    let scale = (y1 - y0) / bounds.height;
    text.font_size = TextNote::clamp_font_size(text.font_size * scale);
    // Keep the top-left of the box where the drag put it; the anchor is the baseline.
    text.position = Point::new(x0, y0 + text.font_size);
}

/// Tables scale their cell size; the grid shape is unchanged.
fn resize_table(table: &mut Table, corner: HandleKind, delta: Vec2) {
    let (x0, y0, x1, y1) = resized_box(&table.bounds(), corner, delta);
    table.cell_width = ((x1 - x0) / table.cols as f64).max(Table::MIN_CELL_WIDTH);
    table.cell_height = ((y1 - y0) / table.rows as f64).max(Table::MIN_CELL_HEIGHT);
    table.position = Point::new(x0, y0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Line, Rectangle, SerializableColor, Stroke};
    use kurbo::Rect;

    fn rect_shape() -> Shape {
        Shape::Rectangle(Rectangle::new(
            "ana",
            Rect::new(0.0, 0.0, 100.0, 50.0),
            SerializableColor::black(),
            2.0,
        ))
    }

    #[test]
    fn test_corner_handles_follow_bounds() {
        let handles = get_handles(&rect_shape());
        assert_eq!(handles.len(), 4);
        assert_eq!(handles[3].position, Point::new(100.0, 50.0));
        assert_eq!(handles[3].kind, HandleKind::BottomRight);
    }

    #[test]
    fn test_line_has_endpoint_handles() {
        let line = Shape::Line(Line::new(
            "ana",
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            SerializableColor::black(),
            2.0,
        ));
        assert_eq!(hit_test_handles(&line, Point::new(52.0, 49.0), HANDLE_HIT_TOLERANCE), Some(HandleKind::End));
        assert_eq!(hit_test_handles(&line, Point::new(25.0, 25.0), HANDLE_HIT_TOLERANCE), None);
    }

    #[test]
    fn test_move_without_handle() {
        let moved = apply_manipulation(&rect_shape(), None, Vec2::new(10.0, 20.0));
        let bounds = moved.bounds();
        assert!((bounds.min_x - 10.0).abs() < f64::EPSILON);
        assert!((bounds.min_y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_corner_resize_rect() {
        let resized = apply_manipulation(&rect_shape(), Some(HandleKind::BottomRight), Vec2::new(20.0, 10.0));
        let bounds = resized.bounds();
        assert!((bounds.width - 120.0).abs() < f64::EPSILON);
        assert!((bounds.height - 60.0).abs() < f64::EPSILON);

        let flipped = apply_manipulation(&rect_shape(), Some(HandleKind::TopLeft), Vec2::new(150.0, 0.0));
        let bounds = flipped.bounds();
        assert!((bounds.min_x - 100.0).abs() < f64::EPSILON);
        assert!((bounds.width - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stroke_resize_scales_points() {
        let stroke = Shape::Stroke(Stroke::new(
            "ana",
            vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0), Point::new(20.0, 20.0)],
            SerializableColor::black(),
            2.0,
        ));
        let resized = apply_manipulation(&stroke, Some(HandleKind::BottomRight), Vec2::new(20.0, 20.0));
        let points = &resized.as_stroke().unwrap().points;
        assert_eq!(points[1], Point::new(20.0, 20.0));
        assert_eq!(points[2], Point::new(40.0, 40.0));
    }

    #[test]
    fn test_text_resize_scales_font_within_clamp() {
        let text = Shape::Text(TextNote::new("ana", Point::new(0.0, 24.0), "hi", SerializableColor::black(), 24.0));
        let grown = apply_manipulation(&text, Some(HandleKind::BottomRight), Vec2::new(0.0, 28.8));
        let note = grown.as_text().unwrap();
        assert!((note.font_size - 48.0).abs() < 1e-9);
        assert!((note.position.y - 48.0).abs() < 1e-9);

        let huge = apply_manipulation(&text, Some(HandleKind::BottomRight), Vec2::new(0.0, 10_000.0));
        assert!((huge.as_text().unwrap().font_size - TextNote::MAX_FONT_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_table_resize_respects_min_cell() {
        let table = Shape::Table(Table::new("ana", Point::ZERO, 2, 2, SerializableColor::black()));
        let shrunk = apply_manipulation(&table, Some(HandleKind::BottomRight), Vec2::new(-230.0, -75.0));
        let t = shrunk.as_table().unwrap();
        assert!((t.cell_width - Table::MIN_CELL_WIDTH).abs() < f64::EPSILON);
        assert!((t.cell_height - Table::MIN_CELL_HEIGHT).abs() < f64::EPSILON);
        assert!(t.is_grid_complete());
    }

    #[test]
    fn test_handle_names() {
        assert_eq!(HandleKind::from_name("top-right"), Some(HandleKind::TopRight));
        assert_eq!(HandleKind::from_name("middle"), None);
        assert!(!HandleKind::Start.is_corner());
    }
}
