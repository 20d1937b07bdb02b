//! Board session: the context object owning one participant's document,
//! undo stacks and replication transport.
//!
//! Every local mutation follows the same sequence: capture an undo frame,
//! mutate the document, prepend a history entry, broadcast. Peer messages
//! are applied directly, without capturing or re-broadcasting.

use crate::config::BoardConfig;
use crate::document::{BoardDocument, DocumentSnapshot};
use crate::handles::{HandleKind, apply_manipulation};
use crate::history::HistoryEntry;
use crate::sanitize::{sanitize_plain, sanitize_rich};
use crate::shapes::{SerializableColor, Shape, ShapeId, ShapeKind, Stroke, Table, TextNote};
use crate::sync::{
    ChannelState, DetachedTransport, ReplicationTransport, SyncEvent, SyncMessage, SyncPayload,
    open_platform_transport,
};
use crate::undo::UndoManager;
use kurbo::{Point, Vec2};
use uuid::Uuid;

/// Options for [`BoardSession::apply_shape_update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// The caller already captured an undo frame for this change.
    pub skip_undo_snapshot: bool,
}

/// Options for [`BoardSession::update_table_cell`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellOptions {
    /// Keep the inline markup subset instead of plain text.
    pub rich: bool,
    pub skip_undo_snapshot: bool,
}

/// An in-progress drag or resize.
#[derive(Debug, Clone)]
struct Gesture {
    shape_id: ShapeId,
    handle: Option<HandleKind>,
    start: Point,
    original: Shape,
    before: DocumentSnapshot,
}

/// One participant in a shared board.
pub struct BoardSession {
    sender_id: String,
    user: String,
    config: BoardConfig,
    document: BoardDocument,
    undo: UndoManager,
    transport: Box<dyn ReplicationTransport>,
    state: ChannelState,
    dirty: bool,
    gesture: Option<Gesture>,
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("sender_id", &self.sender_id)
            .field("user", &self.user)
            .field("state", &self.state)
            .field("shapes", &self.document.len())
            .finish_non_exhaustive()
    }
}

impl BoardSession {
    /// Create a session with an empty document.
    pub fn new(config: BoardConfig, transport: Box<dyn ReplicationTransport>) -> Self {
        Self::with_document(config, BoardDocument::new(), transport)
    }

    /// Create a session seeded with a previously persisted document.
    pub fn with_document(
        config: BoardConfig,
        mut document: BoardDocument,
        transport: Box<dyn ReplicationTransport>,
    ) -> Self {
        document.history_mut().truncate(config.history_limit);
        let user = config.user_name.clone();
        let undo = UndoManager::new(config.undo_limit);
        Self {
            sender_id: Uuid::new_v4().to_string(),
            user,
            config,
            document,
            undo,
            transport,
            state: ChannelState::Disconnected,
            dirty: false,
            gesture: None,
        }
    }

    /// Create a session on this platform's broadcast channel.
    pub fn open(config: BoardConfig, document: BoardDocument) -> Self {
        let transport = open_platform_transport(&config.channel);
        Self::with_document(config, document, transport)
    }

    /// Create a single-context session that never replicates.
    pub fn detached(config: BoardConfig) -> Self {
        Self::new(config, Box::new(DetachedTransport))
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn user_name(&self) -> &str {
        &self.user
    }

    /// Change the display name used for new history entries.
    /// Blank names are rejected.
    pub fn set_user_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name == self.user {
            return false;
        }
        log::info!("User renamed from {} to {}", self.user, name);
        self.user = name.to_string();
        true
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn document(&self) -> &BoardDocument {
        &self.document
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_replicating(&self) -> bool {
        self.transport.is_available()
    }

    /// True when the document changed since the last [`BoardSession::mark_clean`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    // ------------------------------------------------------------------
    // Channel lifecycle
    // ------------------------------------------------------------------

    /// Join the channel and ask peers for their state.
    pub fn connect(&mut self) {
        if self.state != ChannelState::Disconnected {
            return;
        }
        if !self.transport.is_available() {
            log::info!("No broadcast transport, working in single-context mode");
            self.state = ChannelState::Synced;
            return;
        }
        self.state = ChannelState::Connecting;
        log::info!("Joining {} as {}", self.config.channel, self.sender_id);
        self.send(SyncPayload::SyncRequest);
    }

    /// Declare convergence when no peer answered the join request.
    pub fn settle(&mut self) {
        if self.state == ChannelState::Connecting {
            log::info!("No sync-state received, starting from local state");
            self.state = ChannelState::Synced;
        }
    }

    /// Leave the channel. Local editing keeps working.
    ///
    /// The transport is closed for good; use [`BoardSession::reconnect`] to
    /// join again on a fresh one.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.state = ChannelState::Disconnected;
    }

    /// Swap in a new transport and join the channel again.
    pub fn reconnect(&mut self, transport: Box<dyn ReplicationTransport>) {
        self.transport.close();
        self.transport = transport;
        self.state = ChannelState::Disconnected;
        self.connect();
    }

    /// Drain the transport and apply every queued peer message.
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        let messages = self.transport.poll_messages();
        messages
            .into_iter()
            .filter_map(|message| self.handle_message(message))
            .collect()
    }

    /// Apply one peer message. Returns `None` when it was ignored.
    pub fn handle_message(&mut self, message: SyncMessage) -> Option<SyncEvent> {
        if message.sender_id == self.sender_id {
            return None;
        }
        log::debug!("Received {} from {}", message.payload.kind(), message.sender_id);

        let event = match message.payload {
            SyncPayload::AddShape { shape, history } => {
                let shape = shape.normalized();
                let id = shape.id().to_string();
                if !self.document.upsert_shape(shape) {
                    return None;
                }
                self.record_remote(history);
                SyncEvent::ShapeAdded(id)
            }
            SyncPayload::UpdateShape { shape, history } => {
                let shape = shape.normalized();
                let id = shape.id().to_string();
                if !self.document.upsert_shape(shape) {
                    return None;
                }
                self.record_remote(history);
                SyncEvent::ShapeUpdated(id)
            }
            SyncPayload::DeleteShape { shape_id, history } => {
                self.document.remove_shape(&shape_id);
                self.record_remote(history);
                SyncEvent::ShapeDeleted(shape_id)
            }
            SyncPayload::ClearBoard { history } => {
                self.document.clear_shapes();
                self.record_remote(history);
                SyncEvent::BoardCleared
            }
            SyncPayload::UndoRedo { shapes, history } => {
                self.undo.suppress_next_capture();
                self.replace_document(DocumentSnapshot { shapes, history });
                SyncEvent::StateReplaced
            }
            SyncPayload::SyncRequest => {
                if !self.document.has_state() {
                    return None;
                }
                let payload = SyncPayload::SyncState {
                    shapes: self.document.shapes().to_vec(),
                    history: self.document.history().clone(),
                };
                self.send(payload);
                SyncEvent::SyncAnswered
            }
            SyncPayload::SyncState { shapes, history } => {
                self.restore_bounded(DocumentSnapshot { shapes, history });
                if matches!(self.state, ChannelState::Disconnected | ChannelState::Connecting) {
                    self.state = ChannelState::Synced;
                }
                return Some(SyncEvent::StateReplaced);
            }
        };

        if event.changes_document() {
            self.dirty = true;
        }
        self.activate();
        Some(event)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add a shape on top of the board.
    ///
    /// No-op (false) for strokes with too few points and for ids already
    /// on the board.
    pub fn commit_shape(&mut self, shape: Shape, description: impl Into<String>) -> bool {
        let shape = shape.normalized();
        if let Shape::Stroke(stroke) = &shape {
            if !stroke.is_committable() {
                log::debug!("Ignoring stroke with {} points", stroke.len());
                return false;
            }
        }
        if self.document.contains(shape.id()) {
            log::warn!("Shape {} already exists", shape.id());
            return false;
        }

        self.undo.capture(&self.document);
        let entry = self.entry(description).with_shape(shape.id());
        self.document.add_shape(shape.clone());
        self.record(entry.clone());
        self.broadcast(SyncPayload::AddShape {
            shape,
            history: entry,
        });
        true
    }

    /// Add a shape with the standard description for its kind.
    pub fn add_shape(&mut self, shape: Shape) -> Option<ShapeId> {
        let description = self.describe_creation(&shape);
        let id = shape.id().to_string();
        self.commit_shape(shape, description).then_some(id)
    }

    /// Commit a freehand stroke.
    pub fn commit_stroke(
        &mut self,
        points: Vec<Point>,
        color: SerializableColor,
        width: f64,
    ) -> Option<ShapeId> {
        let stroke = Stroke::new(self.user.clone(), points, color, width);
        self.add_shape(Shape::Stroke(stroke))
    }

    /// Place a text note. Blank content is ignored.
    pub fn place_text(
        &mut self,
        position: Point,
        content: &str,
        color: SerializableColor,
        font_size: f64,
    ) -> Option<ShapeId> {
        let content = sanitize_rich(content);
        if content.is_empty() {
            return None;
        }
        let note = TextNote::new(self.user.clone(), position, content, color, font_size);
        self.add_shape(Shape::Text(note))
    }

    /// Insert an empty table. Dimensions are clamped.
    pub fn insert_table(
        &mut self,
        position: Point,
        rows: usize,
        cols: usize,
        color: SerializableColor,
    ) -> Option<ShapeId> {
        let table = Table::new(self.user.clone(), position, rows, cols, color);
        self.add_shape(Shape::Table(table))
    }

    /// Replace an existing shape by id.
    ///
    /// Fails (false) when the id is unknown or the kind would change.
    pub fn apply_shape_update(
        &mut self,
        shape: Shape,
        description: impl Into<String>,
        options: UpdateOptions,
    ) -> bool {
        let shape = shape.normalized();
        match self.document.get_shape(shape.id()) {
            Some(existing) if existing.kind() == shape.kind() => {}
            Some(existing) => {
                log::warn!(
                    "Refusing to turn {} into a {}",
                    existing.kind().label(),
                    shape.kind().label()
                );
                return false;
            }
            None => return false,
        }

        if !options.skip_undo_snapshot {
            self.undo.capture(&self.document);
        }
        let entry = self.entry(description).with_shape(shape.id());
        self.document.replace_shape(shape.clone());
        self.record(entry.clone());
        self.broadcast(SyncPayload::UpdateShape {
            shape,
            history: entry,
        });
        true
    }

    /// Move a shape by `delta`.
    pub fn move_shape(&mut self, id: &str, delta: Vec2) -> bool {
        let Some(mut shape) = self.document.get_shape(id).cloned() else {
            return false;
        };
        shape.translate(delta);
        let description = self.describe(&format!("moved a {}", shape.kind().label()));
        self.apply_shape_update(shape, description, UpdateOptions::default())
    }

    /// Remove a shape by id.
    pub fn delete_shape(&mut self, id: &str, description: impl Into<String>) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        self.undo.capture(&self.document);
        let entry = self.entry(description).with_shape(id);
        self.document.remove_shape(id);
        self.record(entry.clone());
        self.broadcast(SyncPayload::DeleteShape {
            shape_id: id.to_string(),
            history: entry,
        });
        true
    }

    /// Remove a shape with the standard description.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(kind) = self.document.get_shape(id).map(Shape::kind) else {
            return false;
        };
        let description = self.describe(&format!("deleted a {}", kind.label()));
        self.delete_shape(id, description)
    }

    /// Remove every shape. No-op on an empty board.
    pub fn clear_board(&mut self) -> bool {
        if self.document.is_empty() {
            return false;
        }
        self.undo.capture(&self.document);
        let entry = self.entry(self.describe("cleared the board"));
        self.document.clear_shapes();
        self.record(entry.clone());
        self.broadcast(SyncPayload::ClearBoard { history: entry });
        true
    }

    /// Edit one table cell. Unchanged content (after sanitizing) is a no-op.
    pub fn update_table_cell(
        &mut self,
        table_id: &str,
        row: usize,
        col: usize,
        value: &str,
        options: CellOptions,
    ) -> bool {
        let value = if options.rich {
            sanitize_rich(value)
        } else {
            sanitize_plain(value)
        };
        let Some(mut table) = self.document.get_shape(table_id).and_then(Shape::as_table).cloned() else {
            return false;
        };
        match table.cell_at(row, col) {
            Some(cell) if cell.content == value => return false,
            Some(_) => {}
            None => return false,
        }
        table.set_cell_content(row, col, value);
        let description = self.describe(&format!("edited cell ({}, {})", row + 1, col + 1));
        self.apply_shape_update(
            Shape::Table(table),
            description,
            UpdateOptions {
                skip_undo_snapshot: options.skip_undo_snapshot,
            },
        )
    }

    /// Replace a text note's content. Clearing a note deletes it.
    pub fn edit_text(&mut self, id: &str, content: &str) -> bool {
        let content = sanitize_rich(content);
        let Some(mut note) = self.document.get_shape(id).and_then(Shape::as_text).cloned() else {
            return false;
        };
        if note.content == content {
            return false;
        }
        if content.is_empty() {
            return self.delete(id);
        }
        note.content = content;
        let description = self.describe("edited a text note");
        self.apply_shape_update(Shape::Text(note), description, UpdateOptions::default())
    }

    /// Change a text note's font size (clamped).
    pub fn set_text_font_size(&mut self, id: &str, font_size: f64) -> bool {
        let Some(mut note) = self.document.get_shape(id).and_then(Shape::as_text).cloned() else {
            return false;
        };
        let font_size = TextNote::clamp_font_size(font_size);
        if (note.font_size - font_size).abs() < f64::EPSILON {
            return false;
        }
        note.font_size = font_size;
        let description = self.describe("resized a text note");
        self.apply_shape_update(Shape::Text(note), description, UpdateOptions::default())
    }

    /// Change a table's row and column count (clamped).
    pub fn resize_table_grid(&mut self, id: &str, rows: usize, cols: usize) -> bool {
        let Some(mut table) = self.document.get_shape(id).and_then(Shape::as_table).cloned() else {
            return false;
        };
        let (rows, cols) = (Table::clamp_dimension(rows), Table::clamp_dimension(cols));
        if table.rows == rows && table.cols == cols {
            return false;
        }
        table.resize_grid(rows, cols);
        let description = self.describe(&format!("resized a table to {}x{}", rows, cols));
        self.apply_shape_update(Shape::Table(table), description, UpdateOptions::default())
    }

    /// Eraser: delete the topmost shape under `point`.
    pub fn erase_at(&mut self, point: Point) -> Option<ShapeId> {
        let (id, kind) = self
            .document
            .shape_at(point, self.config.hit_tolerance)
            .map(|s| (s.id().to_string(), s.kind()))?;
        let description = self.describe(&format!("erased a {}", kind.label()));
        self.delete_shape(&id, description).then_some(id)
    }

    /// Remove an entry from the activity log. An entry linked to a shape
    /// still on the board deletes that shape too.
    ///
    /// The log removal itself is local; the cascaded delete replicates.
    pub fn remove_history_entry(&mut self, entry_id: &str) -> bool {
        let Some(entry) = self.document.history().get(entry_id).cloned() else {
            return false;
        };
        if let Some(shape_id) = &entry.shape_id {
            if self.document.contains(shape_id) {
                self.delete(shape_id);
            }
        }
        self.document.history_mut().remove(entry_id);
        self.dirty = true;
        true
    }

    /// Restore the state before the last local mutation.
    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        let Some(previous) = self.undo.undo(&self.document) else {
            return false;
        };
        self.replace_document(previous);
        self.finish_jump("undid last action");
        true
    }

    /// Re-apply the last undone mutation.
    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        let Some(next) = self.undo.redo(&self.document) else {
            return false;
        };
        self.replace_document(next);
        self.finish_jump("redid last action");
        true
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Start dragging a shape (`handle` is `None`) or one of its handles.
    pub fn begin_gesture(&mut self, shape_id: &str, handle: Option<HandleKind>, point: Point) -> bool {
        self.cancel_gesture();
        let Some(original) = self.document.get_shape(shape_id).cloned() else {
            return false;
        };
        self.gesture = Some(Gesture {
            shape_id: shape_id.to_string(),
            handle,
            start: point,
            original,
            before: self.document.snapshot(),
        });
        true
    }

    /// Preview the gesture at `point`. Nothing is logged or broadcast.
    pub fn update_gesture(&mut self, point: Point) -> bool {
        let Some(gesture) = &self.gesture else {
            return false;
        };
        let preview = apply_manipulation(&gesture.original, gesture.handle, point - gesture.start);
        self.document.replace_shape(preview)
    }

    /// Commit the gesture as a single undoable update.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        let Some(current) = self.document.get_shape(&gesture.shape_id).cloned() else {
            return false;
        };
        if current == gesture.original {
            return false;
        }
        let verb = if gesture.handle.is_some() { "resized" } else { "moved" };
        let description = self.describe(&format!("{} a {}", verb, current.kind().label()));
        self.undo.capture_snapshot(gesture.before);
        self.apply_shape_update(
            current,
            description,
            UpdateOptions {
                skip_undo_snapshot: true,
            },
        )
    }

    /// Abandon the gesture, putting the shape back where it started.
    pub fn cancel_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        self.document.replace_shape(gesture.original);
        true
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn describe(&self, action: &str) -> String {
        format!("{} {}", self.user, action)
    }

    fn describe_creation(&self, shape: &Shape) -> String {
        match shape {
            Shape::Stroke(stroke) => self.describe(&format!("drew a stroke ({} pts)", stroke.len())),
            Shape::Text(_) => self.describe("added a text note"),
            Shape::Table(table) => self.describe(&format!(
                "added a {}x{} table",
                Table::clamp_dimension(table.rows),
                Table::clamp_dimension(table.cols)
            )),
            other => self.describe(&format!("drew a {}", other.kind().label())),
        }
    }

    fn entry(&self, description: impl Into<String>) -> HistoryEntry {
        HistoryEntry::new(self.user.clone(), description)
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.document
            .history_mut()
            .record(entry, self.config.history_limit);
        self.dirty = true;
    }

    fn record_remote(&mut self, entry: HistoryEntry) {
        if self.document.history().contains(&entry.id) {
            return;
        }
        self.record(entry);
    }

    /// Swap in a whole state. Runs through the undo capture so that a pending
    /// one-shot guard is consumed here rather than by the next edit.
    fn replace_document(&mut self, snapshot: DocumentSnapshot) {
        self.undo.capture(&self.document);
        self.restore_bounded(snapshot);
    }

    /// Restore a whole state, holding the log to the configured limit.
    fn restore_bounded(&mut self, snapshot: DocumentSnapshot) {
        self.document.restore(snapshot);
        self.document
            .history_mut()
            .truncate(self.config.history_limit);
        self.dirty = true;
    }

    /// Log a local undo/redo and replicate the resulting state.
    fn finish_jump(&mut self, action: &str) {
        let entry = self.entry(self.describe(action));
        self.record(entry);
        self.broadcast(SyncPayload::UndoRedo {
            shapes: self.document.shapes().to_vec(),
            history: self.document.history().clone(),
        });
    }

    fn activate(&mut self) {
        if self.state == ChannelState::Synced {
            self.state = ChannelState::Active;
        }
    }

    fn broadcast(&mut self, payload: SyncPayload) {
        self.activate();
        self.send(payload);
    }

    fn send(&mut self, payload: SyncPayload) {
        if !self.transport.is_available() {
            return;
        }
        let message = SyncMessage::new(self.sender_id.clone(), payload);
        if let Err(e) = self.transport.send(&message) {
            log::warn!("Failed to broadcast {}: {}", message.payload.kind(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::sync::BroadcastHub;
    use kurbo::Rect;

    fn black() -> SerializableColor {
        SerializableColor::black()
    }

    fn session(hub: &BroadcastHub, user: &str) -> BoardSession {
        BoardSession::new(
            BoardConfig::default().with_user(user),
            Box::new(hub.subscribe()),
        )
    }

    fn three_points() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.0, 0.0)]
    }

    fn latest(session: &BoardSession) -> String {
        session
            .document()
            .history()
            .latest()
            .map(|e| e.description.clone())
            .unwrap_or_default()
    }

    fn rect(session: &mut BoardSession, x: f64) -> ShapeId {
        let shape = crate::shapes::Rectangle::new(
            session.user_name().to_string(),
            Rect::new(x, 0.0, x + 50.0, 50.0),
            black(),
            2.0,
        );
        session.add_shape(Shape::Rectangle(shape)).unwrap()
    }

    #[test]
    fn test_short_stroke_is_noop() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        assert!(a.commit_stroke(vec![Point::new(1.0, 1.0)], black(), 2.0).is_none());
        assert!(a.document().is_empty());
        assert!(a.document().history().is_empty());
        assert!(!a.can_undo());
        assert!(b.poll().is_empty());
    }

    #[test]
    fn test_stroke_undo_redo_scenario() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        let id = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        assert_eq!(a.document().len(), 1);
        let stroke = a.document().get_shape(&id).and_then(Shape::as_stroke).unwrap();
        assert_eq!(stroke.len(), 3);
        assert_eq!(a.document().history().len(), 1);
        assert_eq!(latest(&a), "ana drew a stroke (3 pts)");
        assert_eq!(b.poll(), vec![SyncEvent::ShapeAdded(id.clone())]);

        assert!(a.undo());
        assert!(a.document().is_empty());
        assert_eq!(latest(&a), "ana undid last action");
        assert_eq!(a.undo_manager().redo_count(), 1);

        assert!(a.redo());
        assert!(a.document().contains(&id));
        assert_eq!(latest(&a), "ana redid last action");

        // The peer follows along through full-state replication.
        let events = b.poll();
        assert_eq!(events, vec![SyncEvent::StateReplaced, SyncEvent::StateReplaced]);
        assert_eq!(b.document().shapes(), a.document().shapes());
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");
        assert!(!a.undo());
        assert!(!a.redo());
        assert!(a.document().history().is_empty());
        assert!(b.poll().is_empty());
    }

    #[test]
    fn test_undo_redo_inverse_law() {
        let mut a = BoardSession::detached(BoardConfig::default().with_user("ana"));
        rect(&mut a, -200.0);
        let before = a.document().snapshot();

        let stroke = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        let table = a.insert_table(Point::new(100.0, 100.0), 2, 2, black()).unwrap();
        a.update_table_cell(&table, 0, 1, "x", CellOptions::default());
        a.move_shape(&stroke, Vec2::new(5.0, 5.0));
        rect(&mut a, 300.0);
        let after = a.document().snapshot();
        assert_eq!(a.undo_manager().undo_count(), 6);

        for _ in 0..5 {
            assert!(a.undo());
        }
        assert_eq!(a.document().shapes(), before.shapes.as_slice());
        // History is the earlier log plus a single "undid" line.
        let entries = a.document().history().entries();
        assert_eq!(entries.len(), before.history.len() + 1);
        assert_eq!(entries[0].description, "ana undid last action");
        assert_eq!(&entries[1..], before.history.entries());

        for _ in 0..5 {
            assert!(a.redo());
        }
        assert_eq!(a.document().shapes(), after.shapes.as_slice());
        let entries = a.document().history().entries();
        assert_eq!(entries.len(), after.history.len() + 1);
        assert_eq!(entries[0].description, "ana redid last action");
        assert_eq!(&entries[1..], after.history.entries());
        assert!(!a.redo());
    }

    #[test]
    fn test_new_edit_after_undo_clears_redo() {
        let mut a = BoardSession::detached(BoardConfig::default());
        a.commit_stroke(three_points(), black(), 2.0);
        a.undo();
        assert!(a.can_redo());
        a.commit_stroke(three_points(), black(), 2.0);
        assert!(!a.can_redo());
        assert_eq!(a.undo_manager().undo_count(), 1);
    }

    #[test]
    fn test_remote_undo_redo_suppresses_exactly_once() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        a.commit_stroke(three_points(), black(), 2.0);
        b.poll();
        a.undo();
        assert_eq!(b.poll(), vec![SyncEvent::StateReplaced]);
        assert!(b.document().is_empty());
        assert_eq!(b.undo_manager().undo_count(), 0);
        let after_remote = b.document().snapshot();

        b.commit_stroke(three_points(), black(), 2.0);
        assert_eq!(b.undo_manager().undo_count(), 1);
        assert_eq!(b.undo_manager().peek_undo(), Some(&after_remote));

        b.commit_stroke(three_points(), black(), 2.0);
        assert_eq!(b.undo_manager().undo_count(), 2);
    }

    #[test]
    fn test_self_echo_is_ignored() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");

        let id = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        // The hub delivers our own message back to us.
        assert!(a.poll().is_empty());
        assert_eq!(a.document().len(), 1);
        assert_eq!(a.document().history().len(), 1);

        let forged = SyncMessage::new(
            a.sender_id().to_string(),
            SyncPayload::DeleteShape {
                shape_id: id.clone(),
                history: HistoryEntry::new("ana", "ana deleted a stroke"),
            },
        );
        assert!(a.handle_message(forged).is_none());
        assert!(a.document().contains(&id));
    }

    #[test]
    fn test_clear_board_is_idempotent() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        a.commit_stroke(three_points(), black(), 2.0);
        b.poll();
        assert!(a.clear_board());
        assert!(!a.clear_board());

        let cleared = a
            .document()
            .history()
            .entries()
            .iter()
            .filter(|e| e.description == "ana cleared the board")
            .count();
        assert_eq!(cleared, 1);
        assert_eq!(b.poll(), vec![SyncEvent::BoardCleared]);
        assert!(b.document().is_empty());
    }

    #[test]
    fn test_undo_stack_is_bounded() {
        let mut a = BoardSession::detached(BoardConfig::default());
        for _ in 0..60 {
            a.commit_stroke(three_points(), black(), 2.0);
        }
        assert_eq!(a.undo_manager().undo_count(), 50);
        assert_eq!(a.document().len(), 60);
    }

    #[test]
    fn test_table_cell_edit() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        let id = a.insert_table(Point::ZERO, 2, 3, black()).unwrap();
        assert_eq!(latest(&a), "ana added a 2x3 table");
        b.poll();

        assert!(a.update_table_cell(&id, 1, 2, "  total  ", CellOptions::default()));
        assert_eq!(latest(&a), "ana edited cell (2, 3)");
        let history_len = a.document().history().len();

        // Same value after trimming: nothing happens.
        assert!(!a.update_table_cell(&id, 1, 2, "total", CellOptions::default()));
        assert_eq!(a.document().history().len(), history_len);
        assert!(!a.update_table_cell(&id, 5, 0, "x", CellOptions::default()));

        let rich = CellOptions {
            rich: true,
            ..CellOptions::default()
        };
        assert!(a.update_table_cell(&id, 0, 0, "<B onclick=\"x\">hi</B><script>1</script>", rich));

        assert_eq!(
            b.poll(),
            vec![SyncEvent::ShapeUpdated(id.clone()), SyncEvent::ShapeUpdated(id.clone())]
        );
        let table = b.document().get_shape(&id).and_then(Shape::as_table).unwrap();
        assert_eq!(table.cell_at(1, 2).map(|c| c.content.as_str()), Some("total"));
        assert_eq!(table.cell_at(0, 0).map(|c| c.content.as_str()), Some("<b>hi</b>"));
    }

    #[test]
    fn test_late_joiner_bootstrap() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        a.connect();
        a.settle();
        assert_eq!(a.state(), ChannelState::Synced);
        let id = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        assert_eq!(a.state(), ChannelState::Active);

        let mut b = session(&hub, "bo");
        b.connect();
        assert_eq!(b.state(), ChannelState::Connecting);
        assert_eq!(a.poll(), vec![SyncEvent::SyncAnswered]);
        assert_eq!(b.poll(), vec![SyncEvent::StateReplaced]);
        assert_eq!(b.state(), ChannelState::Synced);
        assert!(b.document().contains(&id));
        assert_eq!(b.document().history(), a.document().history());
        assert!(!b.can_undo());
    }

    #[test]
    fn test_empty_peer_does_not_answer() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        b.connect();
        assert!(a.poll().is_empty());
        assert!(b.poll().is_empty());
        assert_eq!(b.state(), ChannelState::Connecting);
        b.settle();
        assert_eq!(b.state(), ChannelState::Synced);
        b.commit_stroke(three_points(), black(), 2.0);
        assert_eq!(b.state(), ChannelState::Active);
    }

    #[test]
    fn test_detached_session_works_locally() {
        let mut a = BoardSession::detached(BoardConfig::default());
        assert!(!a.is_replicating());
        a.connect();
        assert_eq!(a.state(), ChannelState::Synced);
        assert!(a.commit_stroke(three_points(), black(), 2.0).is_some());
        assert!(a.undo());
        assert!(a.document().is_empty());
        assert!(a.poll().is_empty());
        assert_eq!(latest(&a), "Anonymous undid last action");
    }

    #[test]
    fn test_gesture_produces_one_frame_and_one_broadcast() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        let id = rect(&mut a, 0.0);
        b.poll();
        assert_eq!(a.undo_manager().undo_count(), 1);

        assert!(a.begin_gesture(&id, None, Point::new(10.0, 10.0)));
        for step in 1..=5 {
            assert!(a.update_gesture(Point::new(10.0 + step as f64 * 10.0, 10.0)));
        }
        assert!(b.poll().is_empty());
        assert!(a.end_gesture());

        assert_eq!(a.undo_manager().undo_count(), 2);
        assert_eq!(latest(&a), "ana moved a rectangle");
        assert_eq!(b.poll(), vec![SyncEvent::ShapeUpdated(id.clone())]);
        let moved = b.document().get_shape(&id).unwrap().bounds();
        assert!((moved.min_x - 50.0).abs() < f64::EPSILON);

        assert!(a.undo());
        assert!((a.document().get_shape(&id).unwrap().bounds().min_x).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_gesture_is_described_as_resize() {
        let mut a = BoardSession::detached(BoardConfig::default().with_user("ana"));
        let id = rect(&mut a, 0.0);
        a.begin_gesture(&id, Some(HandleKind::BottomRight), Point::new(50.0, 50.0));
        a.update_gesture(Point::new(80.0, 70.0));
        assert!(a.end_gesture());
        assert_eq!(latest(&a), "ana resized a rectangle");
        let bounds = a.document().get_shape(&id).unwrap().bounds();
        assert!((bounds.width - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unchanged_gesture_leaves_no_frame() {
        let mut a = BoardSession::detached(BoardConfig::default());
        let first = rect(&mut a, 0.0);
        rect(&mut a, 100.0);
        a.undo();
        assert!(a.can_redo());

        assert!(a.begin_gesture(&first, None, Point::new(10.0, 10.0)));
        assert!(!a.end_gesture());
        assert!(a.can_redo());
        assert_eq!(a.undo_manager().undo_count(), 1);
    }

    #[test]
    fn test_cancel_gesture_restores_shape() {
        let mut a = BoardSession::detached(BoardConfig::default());
        let id = rect(&mut a, 0.0);
        let original = a.document().get_shape(&id).cloned();
        a.begin_gesture(&id, None, Point::ZERO);
        a.update_gesture(Point::new(40.0, 40.0));
        assert!(a.cancel_gesture());
        assert_eq!(a.document().get_shape(&id).cloned(), original);
        assert!(!a.is_gesture_active());
        assert_eq!(a.undo_manager().undo_count(), 1);
    }

    #[test]
    fn test_remote_kind_change_is_rejected() {
        let mut a = BoardSession::detached(BoardConfig::default());
        let id = rect(&mut a, 0.0);

        let mut stroke = Stroke::new("mallory", three_points(), black(), 2.0);
        stroke.id = id.clone();
        let message = SyncMessage::new(
            "peer",
            SyncPayload::UpdateShape {
                shape: Shape::Stroke(stroke),
                history: HistoryEntry::new("mallory", "mallory moved a stroke"),
            },
        );
        assert!(a.handle_message(message).is_none());
        assert_eq!(a.document().get_shape(&id).map(Shape::kind), Some(ShapeKind::Rectangle));
        assert_eq!(a.document().history().len(), 1);
    }

    #[test]
    fn test_remote_shapes_are_normalized() {
        let mut a = BoardSession::detached(BoardConfig::default());
        let mut table = Table::new("bo", Point::ZERO, 3, 3, black());
        table.cells.truncate(1);
        let id = table.id.clone();
        let message = SyncMessage::new(
            "peer",
            SyncPayload::AddShape {
                shape: Shape::Table(table),
                history: HistoryEntry::new("bo", "bo added a 3x3 table").with_shape(id.clone()),
            },
        );
        assert_eq!(a.handle_message(message.clone()), Some(SyncEvent::ShapeAdded(id.clone())));
        let stored = a.document().get_shape(&id).and_then(Shape::as_table).unwrap();
        assert!(stored.is_grid_complete());

        // Re-delivery does not duplicate the shape or the log line.
        a.handle_message(message);
        assert_eq!(a.document().len(), 1);
        assert_eq!(a.document().history().len(), 1);
        assert!(!a.can_undo());
    }

    #[test]
    fn test_remove_history_entry_cascades_to_shape() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        let mut b = session(&hub, "bo");

        let id = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        b.poll();
        let entry_id = a.document().history().latest().map(|e| e.id.clone()).unwrap();

        assert!(a.remove_history_entry(&entry_id));
        assert!(!a.document().contains(&id));
        assert!(!a.document().history().contains(&entry_id));
        assert_eq!(b.poll(), vec![SyncEvent::ShapeDeleted(id)]);
        assert!(!a.remove_history_entry(&entry_id));
    }

    #[test]
    fn test_erase_at_removes_topmost() {
        let mut a = BoardSession::detached(BoardConfig::default().with_user("ana"));
        let line = crate::shapes::Line::new("ana", Point::new(0.0, 0.0), Point::new(100.0, 0.0), black(), 2.0);
        let id = a.add_shape(Shape::Line(line)).unwrap();
        assert_eq!(latest(&a), "ana drew a line");

        assert!(a.erase_at(Point::new(50.0, 40.0)).is_none());
        assert_eq!(a.erase_at(Point::new(50.0, 3.0)), Some(id));
        assert_eq!(latest(&a), "ana erased a line");
        assert!(a.document().is_empty());
    }

    #[test]
    fn test_text_edits() {
        let mut a = BoardSession::detached(BoardConfig::default().with_user("ana"));
        assert!(a.place_text(Point::ZERO, "   ", black(), 24.0).is_none());
        let id = a.place_text(Point::new(10.0, 40.0), "hello", black(), 24.0).unwrap();
        assert_eq!(latest(&a), "ana added a text note");

        assert!(!a.edit_text(&id, "hello"));
        assert!(a.edit_text(&id, "hello <i>world</i>"));
        assert_eq!(latest(&a), "ana edited a text note");

        assert!(a.set_text_font_size(&id, 500.0));
        let note = a.document().get_shape(&id).and_then(Shape::as_text).unwrap();
        assert!((note.font_size - TextNote::MAX_FONT_SIZE).abs() < f64::EPSILON);
        assert!(!a.set_text_font_size(&id, 130.0));

        assert!(a.edit_text(&id, ""));
        assert!(!a.document().contains(&id));
        assert_eq!(latest(&a), "ana deleted a text note");
    }

    #[test]
    fn test_resize_table_grid() {
        let mut a = BoardSession::detached(BoardConfig::default().with_user("ana"));
        let id = a.insert_table(Point::ZERO, 2, 2, black()).unwrap();
        assert!(a.resize_table_grid(&id, 4, 20));
        assert_eq!(latest(&a), "ana resized a table to 4x12");
        let table = a.document().get_shape(&id).and_then(Shape::as_table).unwrap();
        assert!(table.is_grid_complete());
        assert!(!a.resize_table_grid(&id, 4, 12));
    }

    #[test]
    fn test_rename_and_dirty_tracking() {
        let mut a = BoardSession::detached(BoardConfig::default());
        assert!(!a.is_dirty());
        assert!(!a.set_user_name("   "));
        assert!(a.set_user_name(" ana "));
        a.commit_stroke(three_points(), black(), 2.0);
        assert!(a.is_dirty());
        assert_eq!(latest(&a), "ana drew a stroke (3 pts)");
        a.mark_clean();
        assert!(!a.is_dirty());
    }

    fn history_of(len: usize) -> History {
        History::from_entries(
            (0..len)
                .map(|i| HistoryEntry::new("bo", format!("bo drew a stroke ({} pts)", i + 2)))
                .collect(),
        )
    }

    #[test]
    fn test_replaced_state_keeps_history_bounded() {
        let mut a = BoardSession::detached(BoardConfig::default());
        let undo_redo = SyncMessage::new(
            "peer",
            SyncPayload::UndoRedo {
                shapes: Vec::new(),
                history: history_of(300),
            },
        );
        assert_eq!(a.handle_message(undo_redo), Some(SyncEvent::StateReplaced));
        assert_eq!(a.document().history().len(), 250);

        let sync_state = SyncMessage::new(
            "peer",
            SyncPayload::SyncState {
                shapes: Vec::new(),
                history: history_of(300),
            },
        );
        assert_eq!(a.handle_message(sync_state), Some(SyncEvent::StateReplaced));
        assert_eq!(a.document().history().len(), 250);
        // Newest entries are the ones kept.
        assert_eq!(latest(&a), "bo drew a stroke (2 pts)");
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let hub = BroadcastHub::new();
        let mut a = session(&hub, "ana");
        a.connect();
        a.disconnect();
        assert_eq!(a.state(), ChannelState::Disconnected);
        assert!(!a.is_replicating());

        a.reconnect(Box::new(hub.subscribe()));
        assert!(a.is_replicating());
        assert_eq!(a.state(), ChannelState::Connecting);

        let mut b = session(&hub, "bo");
        let id = a.commit_stroke(three_points(), black(), 2.0).unwrap();
        assert_eq!(b.poll(), vec![SyncEvent::ShapeAdded(id)]);
    }
}
