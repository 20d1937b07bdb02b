//! Table shape: a grid of editable cells.

use super::{SerializableColor, ShapeId, ShapeTrait, new_shape_id};
use crate::geometry::Bounds;
use crate::time::now_millis;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A single table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: SerializableColor,
}

impl TableCell {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            color: SerializableColor::default(),
        }
    }
}

/// A table anchored at its top-left corner.
///
/// After [`ShapeTrait::normalize`] the grid always holds exactly
/// `rows` x `cols` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub(crate) id: ShapeId,
    #[serde(default)]
    pub(crate) created_by: String,
    #[serde(default)]
    pub(crate) created_at: u64,
    pub position: Point,
    #[serde(default = "default_dimension")]
    pub rows: usize,
    #[serde(default = "default_dimension")]
    pub cols: usize,
    #[serde(default = "default_cell_width")]
    pub cell_width: f64,
    #[serde(default = "default_cell_height")]
    pub cell_height: f64,
    /// Grid line color.
    #[serde(default)]
    pub color: SerializableColor,
    /// Row-major cell grid.
    #[serde(default)]
    pub cells: Vec<Vec<TableCell>>,
}

fn default_dimension() -> usize {
    Table::MIN_DIMENSION
}

fn default_cell_width() -> f64 {
    Table::DEFAULT_CELL_WIDTH
}

fn default_cell_height() -> f64 {
    Table::DEFAULT_CELL_HEIGHT
}

impl Table {
    pub const MIN_DIMENSION: usize = 1;
    pub const MAX_DIMENSION: usize = 12;
    pub const DEFAULT_CELL_WIDTH: f64 = 120.0;
    pub const DEFAULT_CELL_HEIGHT: f64 = 40.0;
    pub const MIN_CELL_WIDTH: f64 = 24.0;
    pub const MIN_CELL_HEIGHT: f64 = 16.0;

    /// Create an empty table with the default cell size.
    pub fn new(
        author: impl Into<String>,
        position: Point,
        rows: usize,
        cols: usize,
        color: SerializableColor,
    ) -> Self {
        let mut table = Self {
            id: new_shape_id(),
            created_by: author.into(),
            created_at: now_millis(),
            position,
            rows,
            cols,
            cell_width: Self::DEFAULT_CELL_WIDTH,
            cell_height: Self::DEFAULT_CELL_HEIGHT,
            color,
            cells: Vec::new(),
        };
        table.normalize();
        table
    }

    pub fn clamp_dimension(n: usize) -> usize {
        n.clamp(Self::MIN_DIMENSION, Self::MAX_DIMENSION)
    }

    pub fn width(&self) -> f64 {
        self.cols as f64 * self.cell_width
    }

    pub fn height(&self) -> f64 {
        self.rows as f64 * self.cell_height
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Set a cell's content. Returns false when the cell does not exist.
    pub fn set_cell_content(&mut self, row: usize, col: usize, content: impl Into<String>) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                cell.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Cell (row, col) under a world point, if any.
    pub fn cell_at_point(&self, point: Point) -> Option<(usize, usize)> {
        let local = point - self.position;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let col = (local.x / self.cell_width) as usize;
        let row = (local.y / self.cell_height) as usize;
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// Change the grid dimensions, keeping existing cell contents where
    /// they still fit.
    pub fn resize_grid(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.normalize();
    }

    /// True when the grid holds exactly `rows` x `cols` cells.
    pub fn is_grid_complete(&self) -> bool {
        self.cells.len() == self.rows && self.cells.iter().all(|r| r.len() == self.cols)
    }
}

impl ShapeTrait for Table {
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
            self.position.x,
            self.position.y,
            self.position.x + self.width(),
            self.position.y + self.height(),
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    fn normalize(&mut self) {
        self.rows = Self::clamp_dimension(self.rows);
        self.cols = Self::clamp_dimension(self.cols);
        if !self.cell_width.is_finite() {
            self.cell_width = Self::DEFAULT_CELL_WIDTH;
        }
        if !self.cell_height.is_finite() {
            self.cell_height = Self::DEFAULT_CELL_HEIGHT;
        }
        self.cell_width = self.cell_width.max(Self::MIN_CELL_WIDTH);
        self.cell_height = self.cell_height.max(Self::MIN_CELL_HEIGHT);

        let cols = self.cols;
        self.cells.resize_with(self.rows, Vec::new);
        for row in &mut self.cells {
            row.resize_with(cols, TableCell::default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_full_grid() {
        let table = Table::new("ana", Point::ZERO, 3, 4, SerializableColor::black());
        assert!(table.is_grid_complete());
        assert_eq!(table.cells.len(), 3);
        assert!(table.cells.iter().all(|r| r.len() == 4));
    }

    #[test]
    fn test_dimensions_are_clamped() {
        let table = Table::new("ana", Point::ZERO, 0, 40, SerializableColor::black());
        assert_eq!(table.rows, 1);
        assert_eq!(table.cols, 12);
        assert!(table.is_grid_complete());
    }

    #[test]
    fn test_ragged_legacy_grid_is_reconciled() {
        let json = r#"{"id":"t1","position":{"x":0.0,"y":0.0},"rows":3,"cols":2,
            "cells":[[{"content":"a"}],[{"content":"b"},{"content":"c"},{"content":"d"}]]}"#;
        let mut table: Table = serde_json::from_str(json).unwrap();
        assert!(!table.is_grid_complete());
        table.normalize();
        assert!(table.is_grid_complete());
        assert_eq!(table.cell_at(0, 0).map(|c| c.content.as_str()), Some("a"));
        assert_eq!(table.cell_at(0, 1).map(|c| c.content.as_str()), Some(""));
        assert_eq!(table.cell_at(1, 1).map(|c| c.content.as_str()), Some("c"));
        assert_eq!(table.cell_at(2, 0).map(|c| c.content.as_str()), Some(""));
    }

    #[test]
    fn test_missing_grid_is_created() {
        let json = r#"{"id":"t2","position":{"x":5.0,"y":5.0},"rows":2,"cols":2}"#;
        let mut table: Table = serde_json::from_str(json).unwrap();
        table.normalize();
        assert!(table.is_grid_complete());
        assert!((table.cell_width - Table::DEFAULT_CELL_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds_are_exact() {
        let table = Table::new("ana", Point::new(10.0, 20.0), 2, 3, SerializableColor::black());
        let bounds = table.bounds();
        assert!((bounds.width - 360.0).abs() < f64::EPSILON);
        assert!((bounds.height - 80.0).abs() < f64::EPSILON);
        assert!((bounds.max_x - 370.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_grid_keeps_content() {
        let mut table = Table::new("ana", Point::ZERO, 2, 2, SerializableColor::black());
        assert!(table.set_cell_content(1, 1, "keep"));
        table.resize_grid(3, 3);
        assert_eq!(table.cell_at(1, 1).map(|c| c.content.as_str()), Some("keep"));
        table.resize_grid(1, 1);
        assert!(table.cell_at(1, 1).is_none());
        assert!(table.is_grid_complete());
    }

    #[test]
    fn test_cell_at_point() {
        let table = Table::new("ana", Point::new(100.0, 100.0), 2, 2, SerializableColor::black());
        assert_eq!(table.cell_at_point(Point::new(130.0, 150.0)), Some((1, 0)));
        assert_eq!(table.cell_at_point(Point::new(99.0, 150.0)), None);
        assert_eq!(table.cell_at_point(Point::new(400.0, 110.0)), None);
    }
}
