//! Undo/redo manager using full document snapshots.

use crate::document::{BoardDocument, DocumentSnapshot};

/// Maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Two bounded snapshot stacks plus a one-shot capture guard.
///
/// The guard is armed by [`UndoManager::undo`], [`UndoManager::redo`] and
/// [`UndoManager::suppress_next_capture`]. Whichever capture runs next
/// clears it without pushing. The session runs that capture as part of
/// swapping in the jumped-to state, so the following local edit pushes a
/// frame holding the post-jump state.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo_stack: Vec<DocumentSnapshot>,
    redo_stack: Vec<DocumentSnapshot>,
    max_history: usize,
    suppress_next: bool,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl UndoManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: max_history.max(1),
            suppress_next: false,
        }
    }

    /// Save the current state before a mutation.
    ///
    /// Returns false when the capture was suppressed by the one-shot guard.
    pub fn capture(&mut self, doc: &BoardDocument) -> bool {
        if self.suppress_next {
            self.suppress_next = false;
            log::debug!("Undo capture suppressed");
            return false;
        }
        self.push_frame(doc.snapshot());
        true
    }

    /// Like [`UndoManager::capture`], for a state taken earlier (the start
    /// of a drag or resize).
    pub fn capture_snapshot(&mut self, snapshot: DocumentSnapshot) -> bool {
        if self.suppress_next {
            self.suppress_next = false;
            log::debug!("Undo capture suppressed");
            return false;
        }
        self.push_frame(snapshot);
        true
    }

    fn push_frame(&mut self, snapshot: DocumentSnapshot) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        cap(&mut self.undo_stack, self.max_history);
    }

    /// Pop the previous state, pushing `current` for redo.
    ///
    /// Returns `None` (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self, current: &BoardDocument) -> Option<DocumentSnapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current.snapshot());
        cap(&mut self.redo_stack, self.max_history);
        self.suppress_next = true;
        Some(previous)
    }

    /// Pop the next state, pushing `current` for undo.
    pub fn redo(&mut self, current: &BoardDocument) -> Option<DocumentSnapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current.snapshot());
        cap(&mut self.undo_stack, self.max_history);
        self.suppress_next = true;
        Some(next)
    }

    /// Arm the one-shot guard, e.g. after a peer's undo/redo replaced the
    /// local state.
    pub fn suppress_next_capture(&mut self) {
        self.suppress_next = true;
    }

    pub fn is_capture_suppressed(&self) -> bool {
        self.suppress_next
    }

    /// The state the next undo would restore.
    pub fn peek_undo(&self) -> Option<&DocumentSnapshot> {
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear both stacks and the guard.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.suppress_next = false;
    }
}

fn cap(stack: &mut Vec<DocumentSnapshot>, max: usize) {
    if stack.len() > max {
        let excess = stack.len() - max;
        stack.drain(..excess);
    }
}
