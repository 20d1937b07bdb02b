//! WebAssembly entry point and the JSON facade for browser UIs.

use crate::{App, AppConfig};
use inkcast_core::handles::HandleKind;
use inkcast_core::session::{BoardSession, CellOptions};
use inkcast_core::shapes::SerializableColor;
use kurbo::Point;
use wasm_bindgen::prelude::*;

/// Initialize logging when the module loads.
#[wasm_bindgen(start)]
pub fn start() {
    crate::init_logging();
    log::info!("Starting inkcast (WASM)");
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_color(color: &str) -> SerializableColor {
    SerializableColor::from_hex(color).unwrap_or_else(|| {
        log::warn!("Invalid color {:?}, using black", color);
        SerializableColor::black()
    })
}

/// A board driven from JavaScript. Shapes and history cross the boundary
/// as JSON strings.
#[wasm_bindgen]
pub struct WebBoard {
    app: App,
}

#[wasm_bindgen]
impl WebBoard {
    /// Open the board. `config_json` is an optional `AppConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebBoard, JsValue> {
        let config = match config_json {
            Some(json) => AppConfig::from_json(&json).map_err(to_js)?,
            None => AppConfig::default(),
        };
        Ok(WebBoard {
            app: App::new(config),
        })
    }

    /// Apply queued peer messages. Returns true when the board changed and
    /// should be redrawn.
    pub fn tick(&mut self) -> bool {
        self.app
            .tick()
            .iter()
            .any(|event| event.changes_document())
    }

    pub fn shapes_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.app.session().document().shapes()).map_err(to_js)
    }

    pub fn history_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.app.session().document().history()).map_err(to_js)
    }

    pub fn user_name(&self) -> String {
        self.app.session().user_name().to_string()
    }

    pub fn set_user_name(&mut self, name: &str) -> bool {
        self.app.set_user_name(name)
    }

    /// `points_json` is an array of `{x, y}` objects.
    pub fn commit_stroke(&mut self, points_json: &str, color: &str, width: f64) -> Result<Option<String>, JsValue> {
        let points: Vec<Point> = serde_json::from_str(points_json).map_err(to_js)?;
        let color = parse_color(color);
        Ok(self.app.edit(|s| s.commit_stroke(points, color, width)))
    }

    pub fn place_text(&mut self, x: f64, y: f64, content: &str, color: &str, font_size: f64) -> Option<String> {
        let color = parse_color(color);
        self.app
            .edit(|s| s.place_text(Point::new(x, y), content, color, font_size))
    }

    pub fn insert_table(&mut self, x: f64, y: f64, rows: usize, cols: usize, color: &str) -> Option<String> {
        let color = parse_color(color);
        self.app
            .edit(|s| s.insert_table(Point::new(x, y), rows, cols, color))
    }

    pub fn update_table_cell(&mut self, table_id: &str, row: usize, col: usize, value: &str, rich: bool) -> bool {
        let options = CellOptions {
            rich,
            ..CellOptions::default()
        };
        self.app
            .edit(|s| s.update_table_cell(table_id, row, col, value, options))
    }

    pub fn edit_text(&mut self, id: &str, content: &str) -> bool {
        self.app.edit(|s| s.edit_text(id, content))
    }

    pub fn set_text_font_size(&mut self, id: &str, font_size: f64) -> bool {
        self.app.edit(|s| s.set_text_font_size(id, font_size))
    }

    pub fn resize_table_grid(&mut self, id: &str, rows: usize, cols: usize) -> bool {
        self.app.edit(|s| s.resize_table_grid(id, rows, cols))
    }

    pub fn delete_shape(&mut self, id: &str) -> bool {
        self.app.edit(|s| s.delete(id))
    }

    pub fn erase_at(&mut self, x: f64, y: f64) -> Option<String> {
        self.app.edit(|s| s.erase_at(Point::new(x, y)))
    }

    pub fn clear_board(&mut self) -> bool {
        self.app.edit(BoardSession::clear_board)
    }

    pub fn remove_history_entry(&mut self, entry_id: &str) -> bool {
        self.app.edit(|s| s.remove_history_entry(entry_id))
    }

    /// Id of the topmost shape under the pointer.
    pub fn shape_at(&self, x: f64, y: f64) -> Option<String> {
        let session = self.app.session();
        session
            .document()
            .shape_at(Point::new(x, y), session.config().hit_tolerance)
            .map(|shape| shape.id().to_string())
    }

    /// Start a drag (`handle` omitted) or a resize from a named handle
    /// such as `"bottom-right"`.
    pub fn begin_gesture(&mut self, id: &str, handle: Option<String>, x: f64, y: f64) -> bool {
        let handle = handle.as_deref().and_then(HandleKind::from_name);
        self.app
            .session_mut()
            .begin_gesture(id, handle, Point::new(x, y))
    }

    pub fn update_gesture(&mut self, x: f64, y: f64) -> bool {
        self.app.session_mut().update_gesture(Point::new(x, y))
    }

    pub fn end_gesture(&mut self) -> bool {
        self.app.edit(BoardSession::end_gesture)
    }

    pub fn cancel_gesture(&mut self) -> bool {
        self.app.session_mut().cancel_gesture()
    }

    pub fn undo(&mut self) -> bool {
        self.app.edit(BoardSession::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.app.edit(BoardSession::redo)
    }

    pub fn can_undo(&self) -> bool {
        self.app.session().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.app.session().can_redo()
    }
}
