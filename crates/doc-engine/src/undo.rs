//! Action-grouped undo/redo.
//!
//! Low-level edits are grouped into named *actions*. Opening an action with
//! the same name as the one already open coalesces into it, so a run of
//! ordinary typing is one undo step; any other name (or an explicit finish)
//! seals the open record. The manager stores reversible deltas only; the
//! document replays them through the buffer and repairs its line index the
//! same way it would for a fresh edit.
//!
//! An empty stack is not an error: [`UndoManager::undo`] and
//! [`UndoManager::redo`] return `None` for "nothing to do".

use crate::selection::Selection;

/// One reversible buffer mutation.
///
/// Applied forward: delete `removed.chars().count()` characters at `offset`,
/// then insert `inserted`. Applied backward: the same with the roles swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOp {
    /// Character offset of the mutation.
    pub offset: usize,
    /// Text that was removed at `offset`.
    pub removed: String,
    /// Text that was inserted at `offset`.
    pub inserted: String,
}

impl EditOp {
    /// Signed length change, in characters.
    pub fn net(&self) -> i64 {
        self.inserted.chars().count() as i64 - self.removed.chars().count() as i64
    }
}

/// A sealed (or open) group of edits undone/redone as one step.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    /// Action name used for coalescing.
    pub action: String,
    /// Selection to restore when this record is undone.
    pub selection_before: Selection,
    /// Selection to restore when this record is redone.
    pub selection_after: Selection,
    /// Edits in application order.
    pub ops: Vec<EditOp>,
}

impl UndoRecord {
    /// Net length change of the whole record, in characters.
    pub fn net(&self) -> i64 {
        self.ops.iter().map(EditOp::net).sum()
    }
}

/// The per-document undo/redo stacks.
#[derive(Debug, Default)]
pub struct UndoManager {
    undo: Vec<UndoRecord>,
    redo: Vec<UndoRecord>,
    open: Option<UndoRecord>,
    /// Undo depth at the last save point; `None` once that point becomes
    /// unreachable (history diverged after an undo).
    clean_depth: Option<usize>,
}

impl UndoManager {
    /// A manager with empty history, clean at depth zero.
    pub fn new() -> Self {
        Self {
            clean_depth: Some(0),
            ..Self::default()
        }
    }

    /// Open an action named `name`, coalescing into the currently open record
    /// when the name matches; otherwise the open record is sealed first.
    pub fn begin(&mut self, name: &str, selection: Selection) {
        if let Some(open) = &self.open {
            if open.action == name {
                return;
            }
            self.finish();
        }
        self.open = Some(UndoRecord {
            action: name.to_string(),
            selection_before: selection,
            selection_after: selection,
            ops: Vec::new(),
        });
    }

    /// Seal the open record, if any. Records with no edits are dropped.
    pub fn finish(&mut self) {
        if let Some(record) = self.open.take()
            && !record.ops.is_empty()
        {
            self.undo.push(record);
        }
    }

    /// Record one applied edit, updating the record's after-selection.
    ///
    /// Any recorded edit invalidates the redo stack.
    pub fn record(&mut self, op: EditOp, selection_after: Selection) {
        if !self.redo.is_empty() {
            self.redo.clear();
            if self.clean_depth.is_some_and(|d| d > self.undo.len()) {
                self.clean_depth = None;
            }
        }
        let open = self.open.get_or_insert_with(|| UndoRecord {
            action: String::from("edit"),
            selection_before: selection_after,
            selection_after,
            ops: Vec::new(),
        });
        open.ops.push(op);
        open.selection_after = selection_after;
    }

    /// Update the open record's after-selection (e.g. when a mutation ends by
    /// positioning the caret somewhere other than the last edit's end).
    pub fn note_selection(&mut self, selection: Selection) {
        if let Some(open) = &mut self.open {
            open.selection_after = selection;
        }
    }

    /// Pop the newest undo record, moving it to the redo stack.
    ///
    /// The caller replays the returned record's ops in reverse and restores
    /// `selection_before`. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&UndoRecord> {
        self.finish();
        let record = self.undo.pop()?;
        self.redo.push(record);
        self.redo.last()
    }

    /// Pop the newest redo record, moving it back to the undo stack.
    ///
    /// The caller replays the returned record's ops forward and restores
    /// `selection_after`. Returns `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&UndoRecord> {
        self.finish();
        let record = self.redo.pop()?;
        self.undo.push(record);
        self.undo.last()
    }

    /// Returns `true` when an undo step is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() || self.open.as_ref().is_some_and(|r| !r.ops.is_empty())
    }

    /// Returns `true` when a redo step is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Declare the current state saved.
    pub fn mark_clean(&mut self) {
        self.finish();
        self.clean_depth = Some(self.undo.len());
    }

    /// Returns `true` when the document matches its last save point.
    pub fn is_clean(&self) -> bool {
        self.open.as_ref().is_none_or(|r| r.ops.is_empty())
            && self.clean_depth == Some(self.undo.len())
    }

    /// Drop all history (e.g. after replacing the document's entire text from
    /// an external source).
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open = None;
        self.clean_depth = None;
    }
}
