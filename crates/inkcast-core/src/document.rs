//! Board document: the shape list and its activity log.

use crate::geometry::Bounds;
use crate::history::History;
use crate::shapes::{Shape, ShapeId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A captured copy of the full document state, used for undo/redo and
/// full-state replication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub shapes: Vec<Shape>,
    pub history: History,
}

impl DocumentSnapshot {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.history.is_empty()
    }
}

/// The live document.
///
/// Shapes are kept back to front; the last shape is the topmost. Methods
/// here never log or broadcast; that is the session's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    shapes: Vec<Shape>,
    history: History,
}

impl BoardDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from untrusted parts: every shape is normalized and
    /// later duplicates of an id are dropped.
    pub fn from_parts(shapes: Vec<Shape>, history: History) -> Self {
        let mut seen = HashSet::new();
        let shapes = shapes
            .into_iter()
            .map(Shape::normalized)
            .filter(|shape| {
                let fresh = seen.insert(shape.id().to_string());
                if !fresh {
                    log::warn!("Dropping duplicate shape {}", shape.id());
                }
                fresh
            })
            .collect();
        Self { shapes, history }
    }

    /// Take a snapshot of the current state.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            shapes: self.shapes.clone(),
            history: self.history.clone(),
        }
    }

    /// Replace the whole state with a snapshot.
    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        *self = Self::from_parts(snapshot.shapes, snapshot.history);
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Append a shape on top. Returns false if the id is already present.
    pub fn add_shape(&mut self, shape: Shape) -> bool {
        if self.contains(shape.id()) {
            return false;
        }
        self.shapes.push(shape);
        true
    }

    /// Replace the shape with the same id in place.
    ///
    /// Returns false when no such shape exists or when the replacement has a
    /// different kind.
    pub fn replace_shape(&mut self, shape: Shape) -> bool {
        let Some(slot) = self.shapes.iter_mut().find(|s| s.id() == shape.id()) else {
            return false;
        };
        if slot.kind() != shape.kind() {
            log::warn!(
                "Refusing to change shape {} from {} to {}",
                shape.id(),
                slot.kind().label(),
                shape.kind().label()
            );
            return false;
        }
        *slot = shape;
        true
    }

    /// Replace by id, or append when the id is unknown.
    pub fn upsert_shape(&mut self, shape: Shape) -> bool {
        if self.contains(shape.id()) {
            self.replace_shape(shape)
        } else {
            self.add_shape(shape)
        }
    }

    /// Remove a shape from the document.
    pub fn remove_shape(&mut self, id: &str) -> Option<Shape> {
        let index = self.shapes.iter().position(|s| s.id() == id)?;
        Some(self.shapes.remove(index))
    }

    /// Remove all shapes. The history is left alone.
    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
    }

    pub fn get_shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get_shape(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True when there is anything worth handing to a late joiner.
    pub fn has_state(&self) -> bool {
        !self.shapes.is_empty() || !self.history.is_empty()
    }

    /// Topmost shape hit at a point (in world coordinates).
    pub fn shape_at(&self, point: Point, tolerance: f64) -> Option<&Shape> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.hit_test(point, tolerance))
    }

    /// Find shapes at a point, front to back.
    pub fn shapes_at_point(&self, point: Point, tolerance: f64) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .filter(|s| s.hit_test(point, tolerance))
            .map(|s| s.id().to_string())
            .collect()
    }

    /// Find shapes that intersect a selection rectangle, back to front.
    pub fn shapes_in_rect(&self, rect: Rect) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .filter(|s| s.intersects_rect(rect))
            .map(|s| s.id().to_string())
            .collect()
    }

    /// Get the bounding box of all shapes.
    pub fn bounds(&self) -> Option<Bounds> {
        self.shapes
            .iter()
            .map(|s| s.bounds().to_rect())
            .reduce(|a, b| a.union(b))
            .map(Bounds::from_rect)
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON, normalizing every shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: Self = serde_json::from_str(json)?;
        Ok(Self::from_parts(raw.shapes, raw.history))
    }
}
