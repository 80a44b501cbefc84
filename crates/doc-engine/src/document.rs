//! The document: buffer, line index, selection, undo, and the smart-editing
//! behaviors layered over them.
//!
//! `Document` is the host-facing surface of the engine. Hosts drive it with
//! plain method calls and drain value events ([`DocEvent`]) after each call;
//! the engine never calls back into the host, so there is no lifetime
//! coupling between the core and a rendering layer.
//!
//! All mutation goes through a single internal edit primitive that keeps the
//! buffer, line index, and undo history consistent, so higher-level features
//! (block editing, replace-all, completion cycling) compose without special
//! cases.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use std::time::Duration;

use doc_engine_lang::{Language, NamedRange, PlainText, StyleRun};

use crate::buffer::{Direction, Granularity, TextBuffer};
use crate::device::{self, Device, MonospaceDevice};
use crate::line_ending::{Encoding, LineEnding};
use crate::line_index::{Edit, LineFlag, LineIndex, WrapConfig, style_guarded};
use crate::search::{self, FastFind, SearchOptions};
use crate::selection::{self, Selection};
use crate::undo::{EditOp, UndoManager};

/// Action name for ordinary typing (coalesced per run).
pub const ACTION_TYPING: &str = "typing";
/// Action name for backward/forward deletes (coalesced per run).
pub const ACTION_DELETE: &str = "delete";
/// Action name for clipboard paste.
pub const ACTION_PASTE: &str = "paste";
/// Action name for cut.
pub const ACTION_CUT: &str = "cut";
/// Action name for a single search-and-replace.
pub const ACTION_REPLACE: &str = "replace";
/// Action name for replace-all (one aggregated step).
pub const ACTION_REPLACE_ALL: &str = "replace all";
/// Action name for word completion cycling.
pub const ACTION_COMPLETE: &str = "complete";

/// A value event emitted by the document for the host to act on.
///
/// Events are queued in order and drained with [`Document::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocEvent {
    /// The selection changed; previously and newly covered lines are dirty.
    SelectionChanged,
    /// The total line count changed.
    LineCountChanged {
        /// The new line count.
        lines: usize,
    },
    /// Lines from `from` onward moved by `delta` visual lines.
    LinesShifted {
        /// First shifted line.
        from: usize,
        /// Signed shift in lines.
        delta: i64,
    },
    /// One or more lines were marked dirty and need restyling/redraw.
    InvalidateDirtyLines,
    /// An edit was applied to a read-only document (reported once per
    /// document; the edit still proceeds in memory).
    ReadOnlyEditAttempted,
}

/// One match reported by [`Document::find_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindAllMatch {
    /// 0-based line of the match start.
    pub line: usize,
    /// Match start, in character offsets.
    pub start: usize,
    /// Match end (exclusive), in character offsets.
    pub end: usize,
    /// Text of the match's line.
    pub line_text: String,
}

#[derive(Debug, Clone)]
struct SearchSpec {
    pattern: String,
    options: SearchOptions,
}

/// Word-completion cycling state. Cleared whenever the typing context breaks.
#[derive(Debug, Clone)]
struct CompletionState {
    /// Offset of the word fragment's first character.
    start: usize,
    /// Candidates, each starting with the original fragment; the fragment
    /// itself is the last entry so cycling wraps back to what was typed.
    candidates: Vec<String>,
    cursor: usize,
}

/// A single open document and everything the engine tracks for it.
pub struct Document {
    name: String,
    buffer: TextBuffer,
    index: LineIndex,
    selection: Selection,
    undo: UndoManager,
    language: Box<dyn Language>,
    device: Box<dyn Device>,

    tab_width: usize,
    wrap_width: Option<usize>,
    soft_wrap: bool,
    tab_inserts_spaces: bool,
    auto_indent: bool,
    smart_indent: bool,
    kiss_duration: Duration,

    read_only: bool,
    read_only_warned: bool,

    search: Option<SearchSpec>,
    fast_find: Option<FastFind>,
    completion: Option<CompletionState>,

    events: Vec<DocEvent>,
    needs_reparse: bool,
    outline: Vec<NamedRange>,
    includes: Vec<String>,
}

impl Document {
    /// Open a plain-text document over `text`.
    pub fn new(text: &str) -> Self {
        Self::with_language(text, "untitled", Box::new(PlainText::new()))
    }

    /// Open a document named `name` using `language` for styling and smart
    /// editing.
    pub fn with_language(text: &str, name: &str, language: Box<dyn Language>) -> Self {
        let buffer = TextBuffer::new(text);
        let device: Box<dyn Device> = Box::new(MonospaceDevice);
        let soft_wrap = catch_unwind(AssertUnwindSafe(|| language.softwrap())).unwrap_or(false);
        let initial_state =
            catch_unwind(AssertUnwindSafe(|| language.initial_state(name))).unwrap_or(0);
        let cfg = WrapConfig {
            tab_width: device::DEFAULT_TAB_WIDTH,
            wrap_width: None,
        };
        let index = LineIndex::build(&buffer, language.as_ref(), device.as_ref(), &cfg, initial_state);
        Self {
            name: name.to_string(),
            buffer,
            index,
            selection: Selection::default(),
            undo: UndoManager::new(),
            language,
            device,
            tab_width: device::DEFAULT_TAB_WIDTH,
            wrap_width: None,
            soft_wrap,
            tab_inserts_spaces: false,
            auto_indent: true,
            smart_indent: true,
            kiss_duration: Duration::ZERO,
            read_only: false,
            read_only_warned: false,
            search: None,
            fast_find: None,
            completion: None,
            events: Vec::new(),
            needs_reparse: true,
            outline: Vec::new(),
            includes: Vec::new(),
        }
    }

    // ---- configuration -------------------------------------------------

    /// The document's name (used for language bootstrapping and host display).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Swap the language plugin and restyle everything.
    pub fn set_language(&mut self, language: Box<dyn Language>) {
        self.language = language;
        self.rebuild_index();
        self.needs_reparse = true;
    }

    /// The active language's name.
    pub fn language_name(&self) -> &str {
        self.language.name()
    }

    /// Swap the metrics device and rewrap everything.
    pub fn set_device(&mut self, device: Box<dyn Device>) {
        self.device = device;
        self.rebuild_index();
    }

    /// Tab width in cells.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Set the tab width and rewrap. Widths below 1 disable soft wrapping.
    pub fn set_tab_width(&mut self, tab_width: usize) {
        if tab_width != self.tab_width {
            self.tab_width = tab_width;
            self.rebuild_index();
        }
    }

    /// Returns `true` when soft wrapping is on.
    pub fn soft_wrap(&self) -> bool {
        self.soft_wrap
    }

    /// Toggle soft wrapping.
    pub fn set_soft_wrap(&mut self, on: bool) {
        if on != self.soft_wrap {
            self.soft_wrap = on;
            self.rebuild_index();
        }
    }

    /// Set the soft-wrap width budget in cells (`None` disables wrapping).
    pub fn set_wrap_width(&mut self, width: Option<usize>) {
        if width != self.wrap_width {
            self.wrap_width = width;
            self.rebuild_index();
        }
    }

    /// When on, a typed tab becomes spaces up to the next tab stop.
    pub fn set_tab_inserts_spaces(&mut self, on: bool) {
        self.tab_inserts_spaces = on;
    }

    /// When on, a typed newline copies the previous line's leading whitespace.
    pub fn set_auto_indent(&mut self, on: bool) {
        self.auto_indent = on;
    }

    /// When on, a closing structural character re-indents its line to match
    /// the opener's line.
    pub fn set_smart_indent(&mut self, on: bool) {
        self.smart_indent = on;
    }

    /// How long the bracket-match flash holds the swapped selection.
    pub fn set_kiss_duration(&mut self, duration: Duration) {
        self.kiss_duration = duration;
    }

    /// Mark the document read-only (edits still apply; see
    /// [`DocEvent::ReadOnlyEditAttempted`]).
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Returns `true` when the document is flagged read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    // ---- queries -------------------------------------------------------

    /// The whole document text (LF-normalized).
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Document length in characters.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` for an empty document.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read access to the underlying buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// The declared on-disk encoding.
    pub fn encoding(&self) -> Encoding {
        self.buffer.encoding()
    }

    /// The preferred newline convention for saving.
    pub fn line_ending(&self) -> LineEnding {
        self.buffer.line_ending()
    }

    /// Number of visual lines.
    pub fn line_count(&self) -> usize {
        self.index.line_count()
    }

    /// The line containing `offset`.
    pub fn offset_to_line(&self, offset: usize) -> usize {
        self.index.offset_to_line(offset)
    }

    /// Character offset of the start of `line`.
    pub fn line_to_offset(&self, line: usize) -> usize {
        self.index.line_start(line)
    }

    /// Text of `line`, without its newline.
    pub fn line_text(&self, line: usize) -> String {
        self.index.line_text(&self.buffer, line)
    }

    /// Text and style runs of `line`, styled with the line's cached state.
    pub fn styled_text(&self, line: usize) -> (String, Vec<StyleRun>) {
        let text = self.line_text(line);
        let state = self.index.line_info(line).map_or(0, |l| l.state);
        let (runs, _) = style_guarded(self.language.as_ref(), &text, state);
        (text, runs)
    }

    /// Returns `true` when `line` needs restyling/redraw.
    pub fn is_line_dirty(&self, line: usize) -> bool {
        self.index.is_dirty(line)
    }

    /// Clear all dirty flags after the host has redrawn.
    pub fn clear_dirty_lines(&mut self) {
        self.index.clear_dirty();
    }

    /// Returns `true` when `line` carries a marker.
    pub fn is_line_marked(&self, line: usize) -> bool {
        self.index.is_marked(line)
    }

    /// Set or clear the marker on `line`.
    pub fn set_line_marked(&mut self, line: usize, marked: bool) {
        self.index.set_marked(line, marked);
    }

    /// Returns `true` when `line` carries `flag`.
    pub fn has_line_flag(&self, line: usize, flag: LineFlag) -> bool {
        self.index.has_flag(line, flag)
    }

    /// Set or clear a host flag (breakpoint, diff marker, ...) on `line`.
    pub fn set_line_flag(&mut self, line: usize, flag: LineFlag, on: bool) {
        self.index.set_flag(line, flag, on);
    }

    /// Content hash of `line`, for host-side diff and dedup.
    pub fn hash_line(&self, line: usize) -> u32 {
        self.buffer
            .hash_line(self.index.line_start(line), self.index.line_text_len(line))
    }

    /// The current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Line and visual column of `offset`.
    pub fn position_of_offset(&self, offset: usize) -> (usize, usize) {
        selection::position_of_offset(&self.buffer, &self.index, offset, self.tab_width)
    }

    /// Character offset of visual `column` on `line`.
    pub fn offset_at_position(&self, line: usize, column: usize) -> usize {
        selection::offset_at_column(&self.buffer, &self.index, line, column, self.tab_width)
    }

    /// Returns `true` when the document differs from its last save point.
    pub fn is_modified(&self) -> bool {
        !self.undo.is_clean()
    }

    /// Declare the current state saved.
    pub fn mark_saved(&mut self) {
        self.undo.mark_clean();
    }

    /// Drain the queued value events.
    pub fn take_events(&mut self) -> Vec<DocEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns `true` when an idle re-parse is pending.
    pub fn needs_reparse(&self) -> bool {
        self.needs_reparse
    }

    /// The symbol outline from the last idle re-parse.
    pub fn outline(&self) -> &[NamedRange] {
        &self.outline
    }

    /// Files named by include/import directives, from the last idle re-parse.
    pub fn include_files(&self) -> &[String] {
        &self.includes
    }

    /// Idle tick: rebuild the symbol outline and include list if edits have
    /// settled since the last one. Returns `true` when work was done.
    pub fn on_idle(&mut self) -> bool {
        if !self.needs_reparse {
            return false;
        }
        self.needs_reparse = false;
        let text = self.buffer.text();
        self.outline = catch_unwind(AssertUnwindSafe(|| self.language.named_ranges(&text)))
            .unwrap_or_default();
        self.includes = catch_unwind(AssertUnwindSafe(|| self.language.include_files(&text)))
            .unwrap_or_default();
        true
    }

    // ---- selection -----------------------------------------------------

    /// Change the selection, marking old and new covered lines dirty.
    ///
    /// Offsets and lines are clamped into bounds; the two rectangles may not
    /// intersect, so both are invalidated.
    pub fn set_selection(&mut self, selection: Selection) {
        let clamped = self.clamp_selection(selection);
        if clamped == self.selection {
            return;
        }
        let old = self.selection;
        self.selection = clamped;
        self.index
            .mark_dirty(old.min_line(&self.index), old.max_line(&self.index) + 1);
        self.index
            .mark_dirty(clamped.min_line(&self.index), clamped.max_line(&self.index) + 1);
        self.emit(DocEvent::SelectionChanged);
        self.emit(DocEvent::InvalidateDirtyLines);
        self.undo.note_selection(clamped);
    }

    /// Expand the selection to whole-line boundaries.
    pub fn select_lines(&mut self) {
        let expanded = self.selection.select_lines(&self.buffer, &self.index);
        self.set_selection(expanded);
    }

    /// Select the entire document.
    pub fn select_all(&mut self) {
        self.set_selection(Selection::stream(0, self.buffer.len()));
    }

    fn clamp_selection(&self, selection: Selection) -> Selection {
        let len = self.buffer.len();
        let last_line = self.index.line_count().saturating_sub(1);
        match selection {
            Selection::Stream { anchor, caret } => {
                Selection::stream(anchor.min(len), caret.min(len))
            }
            Selection::Block {
                anchor_line,
                anchor_column,
                caret_line,
                caret_column,
            } => Selection::block(
                anchor_line.min(last_line),
                anchor_column,
                caret_line.min(last_line),
                caret_column,
            ),
        }
    }

    // ---- undo surface --------------------------------------------------

    /// Open a named undo action; same-named consecutive actions coalesce.
    pub fn start_action(&mut self, name: &str) {
        self.undo.begin(name, self.selection);
    }

    /// Seal the open undo action.
    pub fn finish_action(&mut self) {
        self.undo.finish();
        self.completion = None;
    }

    /// Undo the newest action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.completion = None;
        let Some(record) = self.undo.undo() else {
            return false;
        };
        let record = record.clone();
        for op in record.ops.iter().rev() {
            self.apply_raw(op.offset, op.inserted.chars().count(), &op.removed);
        }
        self.set_selection(record.selection_before);
        true
    }

    /// Redo the newest undone action. Returns `false` when there is nothing
    /// to redo.
    pub fn redo(&mut self) -> bool {
        self.completion = None;
        let Some(record) = self.undo.redo() else {
            return false;
        };
        let record = record.clone();
        for op in &record.ops {
            self.apply_raw(op.offset, op.removed.chars().count(), &op.inserted);
        }
        self.set_selection(record.selection_after);
        true
    }

    // ---- editing -------------------------------------------------------

    /// Insert `text` over the current selection, as its own action.
    pub fn insert(&mut self, text: &str) {
        self.completion = None;
        self.undo.begin("insert", self.selection);
        self.replace_selection_with(&LineEnding::normalize(text));
        self.undo.finish();
    }

    /// Paste `text` over the current selection.
    ///
    /// With a block selection, `text` is split on newlines and pasted as a
    /// rectangle at the selection's top-left corner.
    pub fn paste(&mut self, text: &str) {
        self.completion = None;
        self.undo.begin(ACTION_PASTE, self.selection);
        let text = LineEnding::normalize(text);
        if self.selection.is_block() {
            let lines: Vec<&str> = text.split('\n').collect();
            self.delete_block_selection();
            self.insert_block(&lines);
        } else {
            self.replace_selection_with(&text);
        }
        self.undo.finish();
    }

    /// The selected text, one entry per covered line for a block selection,
    /// a single entry for a stream one.
    pub fn copy_selection(&self) -> Vec<String> {
        self.selection
            .block_lines(&self.buffer, &self.index, self.tab_width)
    }

    /// Cut the selection: copy, then delete it as its own action.
    pub fn cut(&mut self) -> Vec<String> {
        let copied = self.copy_selection();
        if !self.selection.is_empty() {
            self.completion = None;
            self.undo.begin(ACTION_CUT, self.selection);
            self.delete_selection();
            self.undo.finish();
        }
        copied
    }

    /// Drop the selected text at `target` (drag and drop), as one action.
    ///
    /// With `copy` the source stays in place; otherwise it is removed first
    /// and `target` is interpreted against the original text. Dropping a
    /// moved selection onto itself does nothing.
    pub fn drop_text(&mut self, target: usize, copy: bool) {
        if self.selection.is_empty() || self.selection.is_block() {
            return;
        }
        let start = self
            .selection
            .min_offset(&self.buffer, &self.index, self.tab_width);
        let end = self
            .selection
            .max_offset(&self.buffer, &self.index, self.tab_width);
        let target = target.min(self.buffer.len());
        if !copy && target >= start && target <= end {
            return;
        }
        let text = self.buffer.text_in(start, end - start);
        self.completion = None;
        self.undo.begin("drag", self.selection);
        let insert_at = if copy {
            target
        } else {
            self.edit_recorded(start, end - start, "");
            if target > end { target - (end - start) } else { target }
        };
        self.edit_recorded(insert_at, 0, &text);
        self.set_selection(Selection::stream(
            insert_at,
            insert_at + text.chars().count(),
        ));
        self.undo.finish();
    }

    /// Type one character at the selection, with smart-editing behaviors:
    /// tab-to-spaces, auto-indent on newline, smart indent and the balance
    /// flash on closing characters.
    pub fn type_char(&mut self, ch: char) {
        self.completion = None;
        self.undo.begin(ACTION_TYPING, self.selection);

        let text = if ch == '\t' && self.tab_inserts_spaces {
            // The selection is replaced, so the tab lands at its min offset.
            let caret = self
                .selection
                .min_offset(&self.buffer, &self.index, self.tab_width);
            let (_, column) = self.position_of_offset(caret);
            " ".repeat(self.tab_width.max(1) - column % self.tab_width.max(1))
        } else if ch == '\n' && self.auto_indent {
            let caret = self
                .selection
                .min_offset(&self.buffer, &self.index, self.tab_width);
            let line = self.index.offset_to_line(caret);
            let line_start = self.index.line_start(line);
            let indent: String = self
                .line_text(line)
                .chars()
                .take(caret - line_start)
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect();
            format!("\n{indent}")
        } else {
            ch.to_string()
        };

        self.replace_selection_with(&text);

        if self.smart_indent
            && self.lang_guarded(false, |l| l.is_smart_indent_close_char(ch))
        {
            self.smart_indent_close();
        }
        if self.lang_guarded(false, |l| l.is_balance_char(ch)) {
            self.flash_balance();
        }
    }

    /// Delete the selection, or the character before the caret.
    pub fn delete_backward(&mut self) {
        self.completion = None;
        self.undo.begin(ACTION_DELETE, self.selection);
        if !self.selection.is_empty() {
            self.delete_selection();
            return;
        }
        if let Selection::Stream { caret, .. } = self.selection {
            let prev = self
                .buffer
                .prev_cursor_position(caret, Granularity::Character);
            if prev < caret {
                self.edit_recorded(prev, caret - prev, "");
                self.set_selection(Selection::caret(prev));
            }
        }
    }

    /// Delete the selection, or the character after the caret.
    pub fn delete_forward(&mut self) {
        self.completion = None;
        self.undo.begin(ACTION_DELETE, self.selection);
        if !self.selection.is_empty() {
            self.delete_selection();
            return;
        }
        if let Selection::Stream { caret, .. } = self.selection {
            let next = self
                .buffer
                .next_cursor_position(caret, Granularity::Character);
            if next > caret {
                self.edit_recorded(caret, next - caret, "");
                self.set_selection(Selection::caret(caret));
            }
        }
    }

    /// Delete the selected text (stream or rectangle) within the open action.
    pub fn delete_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        if self.selection.is_block() {
            self.delete_block_selection();
        } else {
            let start = self
                .selection
                .min_offset(&self.buffer, &self.index, self.tab_width);
            let end = self
                .selection
                .max_offset(&self.buffer, &self.index, self.tab_width);
            self.edit_recorded(start, end - start, "");
            self.set_selection(Selection::caret(start));
        }
    }

    /// Append host-collected external output (e.g. a shell command's stdout)
    /// at the end of the document, outside any open typing run.
    pub fn on_external_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.undo.finish();
        self.undo.begin("external text", self.selection);
        let end = self.buffer.len();
        self.edit_recorded(end, 0, &LineEnding::normalize(text));
        self.undo.note_selection(self.selection);
        self.undo.finish();
    }

    // ---- block editing -------------------------------------------------

    /// Remove the selected column range from every covered line, splitting
    /// tabs when a column boundary lands inside one. The selection collapses
    /// to a zero-width rectangle at its left edge.
    fn delete_block_selection(&mut self) {
        let (min_col, max_col) = (self.selection.min_column(), self.selection.max_column());
        let first = self.selection.min_line(&self.index);
        let last = self.selection.max_line(&self.index);
        if min_col < max_col {
            for line in (first..=last).rev() {
                let text = self.line_text(line);
                if let Some((start, end, pad)) =
                    column_cut(&text, min_col, max_col, self.tab_width)
                {
                    let offset = self.index.line_start(line) + start;
                    self.edit_recorded(offset, end - start, &pad);
                }
            }
        }
        self.set_selection(Selection::block(first, min_col, last, min_col));
    }

    /// Paste `lines` as a rectangle: one entry per target line, all at the
    /// block caret's column, padding short lines with spaces and appending
    /// new lines past the end of the document.
    fn insert_block(&mut self, lines: &[&str]) {
        let col = self.selection.min_column();
        let first = self.selection.min_line(&self.index);
        for (i, entry) in lines.iter().enumerate() {
            let line = first + i;
            while line >= self.index.line_count() {
                let end = self.buffer.len();
                self.edit_recorded(end, 0, "\n");
            }
            let text = self.line_text(line);
            let width = device::str_width(&text, self.tab_width);
            let line_start = self.index.line_start(line);
            if width <= col {
                let insertion = format!("{}{}", " ".repeat(col - width), entry);
                self.edit_recorded(line_start + text.chars().count(), 0, &insertion);
            } else {
                let (char_idx, remove, prefix, suffix) =
                    column_insert_point(&text, col, self.tab_width);
                let insertion = format!("{prefix}{entry}{suffix}");
                self.edit_recorded(line_start + char_idx, remove, &insertion);
            }
        }
        let width = lines.iter().map(|l| device::str_width(l, self.tab_width)).max();
        let last = first + lines.len().saturating_sub(1);
        self.set_selection(Selection::block(
            first,
            col,
            last,
            col + width.unwrap_or(0),
        ));
    }

    // ---- entab / detab -------------------------------------------------

    /// Convert space runs to tabs over the selection (whole document when the
    /// selection is empty), honoring block-selection column bounds.
    pub fn entab(&mut self) {
        self.transform_span("entab", entab_text);
    }

    /// Convert tabs to spaces over the selection (whole document when the
    /// selection is empty), honoring block-selection column bounds.
    pub fn detab(&mut self) {
        self.transform_span("detab", detab_text);
    }

    fn transform_span(&mut self, action: &str, transform: fn(&str, usize, usize) -> String) {
        self.completion = None;
        self.undo.finish();
        self.undo.begin(action, self.selection);
        if self.selection.is_block() && !self.selection.is_empty() {
            let (min_col, max_col) = (self.selection.min_column(), self.selection.max_column());
            let first = self.selection.min_line(&self.index);
            let last = self.selection.max_line(&self.index);
            for line in (first..=last).rev() {
                let text = self.line_text(line);
                let Some((start, end, _)) = column_cut(&text, min_col, max_col, self.tab_width)
                else {
                    continue;
                };
                let segment: String = text
                    .chars()
                    .skip(start)
                    .take(end - start)
                    .collect();
                let replaced = transform(&segment, min_col, self.tab_width);
                if replaced != segment {
                    let offset = self.index.line_start(line) + start;
                    self.edit_recorded(offset, end - start, &replaced);
                }
            }
        } else {
            let span = if self.selection.is_empty() {
                Selection::stream(0, self.buffer.len())
            } else {
                self.selection.select_lines(&self.buffer, &self.index)
            };
            let (start, end) = match span {
                Selection::Stream { anchor, caret } => (anchor.min(caret), anchor.max(caret)),
                Selection::Block { .. } => unreachable!(),
            };
            let text = self.buffer.text_in(start, end - start);
            let replaced = transform(&text, 0, self.tab_width);
            if replaced != text {
                self.edit_recorded(start, end - start, &replaced);
                self.set_selection(Selection::stream(
                    start,
                    start + replaced.chars().count(),
                ));
            }
        }
        self.undo.finish();
    }

    // ---- comment toggle ------------------------------------------------

    /// Comment out every line covered by the selection. Returns `false` when
    /// the language has no line comments.
    pub fn comment_selection(&mut self) -> bool {
        self.toggle_comment("comment", |lang, line| lang.comment_line(line))
    }

    /// Strip one comment level from every covered line. Returns `false` when
    /// nothing changed.
    pub fn uncomment_selection(&mut self) -> bool {
        self.toggle_comment("uncomment", |lang, line| lang.uncomment_line(line))
    }

    fn toggle_comment(
        &mut self,
        action: &str,
        rewrite: fn(&dyn Language, &str) -> Option<String>,
    ) -> bool {
        self.completion = None;
        self.undo.finish();
        self.undo.begin(action, self.selection);
        let first = self.selection.min_line(&self.index);
        let last = self.selection.max_line(&self.index);
        let mut changed = false;
        for line in (first..=last).rev() {
            let text = self.line_text(line);
            let rewritten =
                self.lang_guarded(None, |lang| rewrite(lang, &text));
            if let Some(new_text) = rewritten
                && new_text != text
            {
                let start = self.index.line_start(line);
                self.edit_recorded(start, text.chars().count(), &new_text);
                changed = true;
            }
        }
        if changed {
            let start = self.index.line_start(first);
            let end = self.index.line_start(last) + self.index.line_text_len(last);
            self.set_selection(Selection::stream(start, end));
        }
        self.undo.finish();
        changed
    }

    // ---- word completion -----------------------------------------------

    /// The word fragment immediately left of the caret: the seed a
    /// completion call would use, or `None` when the caret does not follow a
    /// word.
    pub fn completion_prefix(&self) -> Option<String> {
        let Selection::Stream { anchor, caret } = self.selection else {
            return None;
        };
        if anchor != caret {
            return None;
        }
        let start = self.buffer.prev_cursor_position(caret, Granularity::Word);
        if start >= caret {
            return None;
        }
        let prefix = self.buffer.text_in(start, caret - start);
        prefix
            .chars()
            .all(|c| c == '_' || c.is_alphanumeric())
            .then_some(prefix)
    }

    /// Cycle word completion at the caret.
    ///
    /// The first call captures the fragment left of the caret, gathers
    /// candidates from this buffer (by proximity), `external_candidates`
    /// (other open documents, in registry order), and the language's keyword
    /// list, and inserts the first one. Repeated calls replace the previous
    /// candidate with the next, wrapping through the original fragment.
    pub fn complete_word(&mut self, direction: Direction, external_candidates: &[String]) -> bool {
        let Selection::Stream { anchor, caret } = self.selection else {
            return false;
        };
        if anchor != caret {
            return false;
        }

        self.undo.begin(ACTION_COMPLETE, self.selection);

        if let Some(state) = self.completion.take() {
            let current_len = state.candidates[state.cursor].chars().count();
            if caret == state.start + current_len {
                return self.cycle_completion(state, direction);
            }
        }

        // Fresh completion: capture the fragment left of the caret.
        let Some(prefix) = self.completion_prefix() else {
            return false;
        };
        let start = caret - prefix.chars().count();

        let mut candidates = self.buffer.words_beginning_with(start, direction, &prefix);
        for word in external_candidates {
            if word.starts_with(&prefix) && *word != prefix {
                candidates.push(word.clone());
            }
        }
        for word in self.lang_guarded(Vec::new(), |l| l.keywords_beginning_with(&prefix)) {
            if word != prefix {
                candidates.push(word);
            }
        }
        let mut deduped: Vec<String> = Vec::new();
        for word in candidates {
            if !deduped.contains(&word) {
                deduped.push(word);
            }
        }
        if deduped.is_empty() {
            return false;
        }
        deduped.push(prefix.clone());

        let state = CompletionState {
            start,
            candidates: deduped,
            cursor: 0,
        };
        self.apply_completion(&state, &prefix);
        self.completion = Some(state);
        true
    }

    fn cycle_completion(&mut self, mut state: CompletionState, direction: Direction) -> bool {
        let previous = state.candidates[state.cursor].clone();
        let count = state.candidates.len();
        state.cursor = match direction {
            Direction::Forward => (state.cursor + 1) % count,
            Direction::Backward => (state.cursor + count - 1) % count,
        };
        self.apply_completion(&state, &previous);
        self.completion = Some(state);
        true
    }

    fn apply_completion(&mut self, state: &CompletionState, current: &str) {
        let replacement = state.candidates[state.cursor].clone();
        self.edit_recorded(state.start, current.chars().count(), &replacement);
        self.set_selection(Selection::caret(state.start + replacement.chars().count()));
    }

    // ---- search --------------------------------------------------------

    /// Start a search: remember the pattern and select the first match at or
    /// after the selection start, wrapping to the document start when nothing
    /// follows. Returns `false` on no match (or a malformed pattern).
    pub fn find_first(&mut self, pattern: &str, options: SearchOptions) -> bool {
        self.search = Some(SearchSpec {
            pattern: pattern.to_string(),
            options,
        });
        let from = self
            .selection
            .min_offset(&self.buffer, &self.index, self.tab_width);
        self.select_match(from, Direction::Forward)
            || (from > 0 && self.select_match(0, Direction::Forward))
    }

    /// Select the next match of the remembered pattern in `direction`.
    pub fn find_next(&mut self, direction: Direction) -> bool {
        let from = match direction {
            Direction::Forward => self
                .selection
                .max_offset(&self.buffer, &self.index, self.tab_width),
            Direction::Backward => self
                .selection
                .min_offset(&self.buffer, &self.index, self.tab_width),
        };
        self.select_match(from, direction)
    }

    fn select_match(&mut self, from: usize, direction: Direction) -> bool {
        let Some(spec) = self.search.clone() else {
            return false;
        };
        match self.buffer.find(from, &spec.pattern, direction, spec.options) {
            Ok(Some(m)) => {
                self.set_selection(Selection::stream(m.start, m.end));
                true
            }
            Ok(None) | Err(_) => false,
        }
    }

    /// Replace the selected match with `template` (capture groups expand in
    /// regex mode), then advance to the next match when `advance` is set.
    /// Returns `false` when the selection does not match the pattern.
    pub fn replace(&mut self, template: &str, advance: bool) -> bool {
        let Some(spec) = self.search.clone() else {
            return false;
        };
        let Selection::Stream { anchor, caret } = self.selection else {
            return false;
        };
        let (start, end) = (anchor.min(caret), anchor.max(caret));
        let text = self.buffer.text();
        let m = match search::find_next(&text, &spec.pattern, spec.options, start) {
            Ok(Some(m)) if m.start == start && m.end == end => m,
            _ => return false,
        };
        let replacement = search::replacement_for(&text, &spec.pattern, spec.options, m, template)
            .unwrap_or_else(|_| template.to_string());

        self.completion = None;
        self.undo.finish();
        self.undo.begin(ACTION_REPLACE, self.selection);
        self.edit_recorded(m.start, m.end - m.start, &replacement);
        self.set_selection(Selection::caret(m.start + replacement.chars().count()));
        self.undo.finish();

        if advance {
            self.find_next(Direction::Forward);
        }
        true
    }

    /// Replace every match of `pattern` with `template`, left to right, as
    /// one undo step. Later match offsets are re-derived from the text after
    /// each replacement, so replacements never overlap. Returns the number of
    /// replacements.
    pub fn replace_all(
        &mut self,
        pattern: &str,
        template: &str,
        options: SearchOptions,
    ) -> usize {
        if pattern.is_empty() || search::compile(pattern, options).is_err() {
            return 0;
        }
        self.completion = None;
        self.undo.finish();
        self.undo.begin(ACTION_REPLACE_ALL, self.selection);

        let mut count = 0usize;
        let mut from = 0usize;
        loop {
            let text = self.buffer.text();
            let Ok(Some(m)) = search::find_next(&text, pattern, options, from) else {
                break;
            };
            let replacement = search::replacement_for(&text, pattern, options, m, template)
                .unwrap_or_else(|_| template.to_string());
            self.edit_recorded(m.start, m.end - m.start, &replacement);
            from = m.start + replacement.chars().count();
            count += 1;
        }
        if count > 0 {
            self.set_selection(Selection::caret(from.min(self.buffer.len())));
        }
        self.undo.finish();
        count
    }

    /// All matches of `pattern`, with their lines, optionally restricted to
    /// the current selection. A malformed pattern yields no matches.
    pub fn find_all(
        &self,
        pattern: &str,
        options: SearchOptions,
        restrict_to_selection: bool,
    ) -> Vec<FindAllMatch> {
        let text = self.buffer.text();
        let Ok(matches) = search::find_all(&text, pattern, options) else {
            return Vec::new();
        };
        let (lo, hi) = if restrict_to_selection && !self.selection.is_empty() {
            (
                self.selection
                    .min_offset(&self.buffer, &self.index, self.tab_width),
                self.selection
                    .max_offset(&self.buffer, &self.index, self.tab_width),
            )
        } else {
            (0, self.buffer.len())
        };
        matches
            .into_iter()
            .filter(|m| m.start >= lo && m.end <= hi)
            .map(|m| {
                let line = self.index.offset_to_line(m.start);
                FindAllMatch {
                    line,
                    start: m.start,
                    end: m.end,
                    line_text: self.index.line_text(&self.buffer, line),
                }
            })
            .collect()
    }

    // ---- fast find -----------------------------------------------------

    /// Enter incremental-search mode anchored at the caret.
    pub fn fast_find_start(&mut self, ignore_case: bool) {
        let origin = self
            .selection
            .min_offset(&self.buffer, &self.index, self.tab_width);
        self.fast_find = Some(FastFind::new(
            origin,
            SearchOptions {
                ignore_case,
                is_regex: false,
            },
        ));
    }

    /// Returns `true` while incremental search is active.
    pub fn fast_find_active(&self) -> bool {
        self.fast_find.is_some()
    }

    /// Extend the live query by one character; selects the match when found.
    pub fn fast_find_push(&mut self, ch: char) -> bool {
        let Some(mut ff) = self.fast_find.take() else {
            return false;
        };
        let text = self.buffer.text();
        let found = ff.push_char(ch, &text);
        self.fast_find = Some(ff);
        match found {
            Some(m) => {
                self.set_selection(Selection::stream(m.start, m.end));
                true
            }
            None => false,
        }
    }

    /// Remove one full codepoint from the live query and re-search.
    pub fn fast_find_pop(&mut self) -> bool {
        let Some(mut ff) = self.fast_find.take() else {
            return false;
        };
        let text = self.buffer.text();
        let found = ff.pop_char(&text);
        self.fast_find = Some(ff);
        match found {
            Some(m) => {
                self.set_selection(Selection::stream(m.start, m.end));
                true
            }
            None => false,
        }
    }

    /// Leave incremental-search mode, keeping the pattern for
    /// [`Document::find_next`].
    pub fn fast_find_stop(&mut self) {
        if let Some(ff) = self.fast_find.take()
            && !ff.query().is_empty()
        {
            self.search = Some(SearchSpec {
                pattern: ff.query().to_string(),
                options: SearchOptions::default(),
            });
        }
    }

    // ---- smart editing internals ---------------------------------------

    /// Re-indent the just-typed closing character's line to match its
    /// opener's line, per the language's smart-indent predicates.
    fn smart_indent_close(&mut self) {
        let Selection::Stream { anchor, caret } = self.selection else {
            return;
        };
        if anchor != caret || caret == 0 {
            return;
        }
        let close = caret - 1;
        let line = self.index.offset_to_line(close);
        let line_start = self.index.line_start(line);
        let line_text = self.line_text(line);
        let column = close - line_start;
        if !self.lang_guarded(false, |l| l.is_smart_indent_location(&line_text, column)) {
            return;
        }

        let text = self.buffer.text();
        let Some(opener) = self.lang_guarded(None, |l| l.balance(&text, 0..close + 1, close))
        else {
            return;
        };
        let opener_line = self.index.offset_to_line(opener);
        if opener_line >= line {
            return;
        }
        let indent: String = self
            .line_text(opener_line)
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();

        let before: String = line_text.chars().take(column).collect();
        if before.chars().all(|c| c == ' ' || c == '\t') {
            // Only whitespace precedes the closer: swap it for the opener's.
            self.edit_recorded(line_start, before.chars().count(), &indent);
            self.set_selection(Selection::caret(line_start + indent.chars().count() + 1));
        } else {
            // Break the closer onto a fresh line carrying the opener's indent.
            self.edit_recorded(close, 0, &format!("\n{indent}"));
            self.set_selection(Selection::caret(close + 1 + indent.chars().count() + 1));
        }
    }

    /// Flash the matching opener of the just-typed balance character by
    /// swapping the selection and restoring it after a short hold.
    fn flash_balance(&mut self) {
        let Selection::Stream { anchor, caret } = self.selection else {
            return;
        };
        if anchor != caret || caret == 0 {
            return;
        }
        let close = caret - 1;
        let text = self.buffer.text();

        let window_start = close.saturating_sub(KISS_PROBE_WINDOW);
        let mut opener =
            self.lang_guarded(None, |l| l.balance(&text, window_start..close + 1, close));
        // A miss, or a suspiciously tight hit near the window edge, re-probes
        // over the whole document.
        let degenerate = opener.is_none_or(|o| close - o == 1 || close - o == 3);
        if window_start > 0 && degenerate {
            opener = self.lang_guarded(None, |l| l.balance(&text, 0..close + 1, close));
        }
        let Some(opener) = opener else {
            return;
        };

        let saved = self.selection;
        self.set_selection(Selection::stream(opener, opener + 1));
        if !self.kiss_duration.is_zero() {
            thread::sleep(self.kiss_duration);
        }
        self.set_selection(saved);
    }

    // ---- edit plumbing -------------------------------------------------

    /// Replace the current selection with `text` inside the open action,
    /// leaving the caret after the insertion.
    fn replace_selection_with(&mut self, text: &str) {
        if self.selection.is_block() && !self.selection.is_empty() {
            self.delete_block_selection();
            let offset = self
                .selection
                .min_offset(&self.buffer, &self.index, self.tab_width);
            self.set_selection(Selection::caret(offset));
        }
        let start = self
            .selection
            .min_offset(&self.buffer, &self.index, self.tab_width);
        let end = self
            .selection
            .max_offset(&self.buffer, &self.index, self.tab_width);
        let caret = self.edit_recorded(start, end - start, text);
        self.set_selection(Selection::caret(caret));
    }

    /// Apply one edit through the undo manager. Returns the offset just past
    /// the inserted text.
    fn edit_recorded(&mut self, offset: usize, remove_len: usize, insert: &str) -> usize {
        if self.read_only && !self.read_only_warned {
            self.read_only_warned = true;
            self.emit(DocEvent::ReadOnlyEditAttempted);
        }
        let op = self.apply_raw(offset, remove_len, insert);
        let caret = op.offset + op.inserted.chars().count();
        self.undo.record(op, Selection::caret(caret));
        caret
    }

    /// Mutate the buffer and repair the line index, bypassing undo (used for
    /// undo/redo replay as well as recorded edits).
    fn apply_raw(&mut self, offset: usize, remove_len: usize, insert: &str) -> EditOp {
        let offset = offset.min(self.buffer.len());
        let remove_len = remove_len.min(self.buffer.len() - offset);
        let removed = self.buffer.text_in(offset, remove_len);
        let cfg = self.wrap_config();

        if remove_len > 0 {
            self.buffer.delete(offset, remove_len);
            let delta = self.index.rewrap(
                &self.buffer,
                self.language.as_ref(),
                self.device.as_ref(),
                &cfg,
                Edit::Delete {
                    offset,
                    len: remove_len,
                },
            );
            self.note_line_delta(offset, delta);
        }
        let insert_len = insert.chars().count();
        if insert_len > 0 {
            self.buffer.insert(offset, insert);
            let delta = self.index.rewrap(
                &self.buffer,
                self.language.as_ref(),
                self.device.as_ref(),
                &cfg,
                Edit::Insert {
                    offset,
                    len: insert_len,
                },
            );
            self.note_line_delta(offset, delta);
        }

        self.needs_reparse = true;
        self.emit(DocEvent::InvalidateDirtyLines);
        EditOp {
            offset,
            removed,
            inserted: insert.to_string(),
        }
    }

    fn note_line_delta(&mut self, offset: usize, delta: i64) {
        if delta != 0 {
            let from = self.index.offset_to_line(offset);
            self.events.push(DocEvent::LinesShifted { from, delta });
            self.events.push(DocEvent::LineCountChanged {
                lines: self.index.line_count(),
            });
        }
    }

    fn wrap_config(&self) -> WrapConfig {
        WrapConfig {
            tab_width: self.tab_width,
            wrap_width: if self.soft_wrap { self.wrap_width } else { None },
        }
    }

    fn rebuild_index(&mut self) {
        let initial_state = self.lang_guarded(0, |l| l.initial_state(&self.name));
        self.index = LineIndex::build(
            &self.buffer,
            self.language.as_ref(),
            self.device.as_ref(),
            &self.wrap_config(),
            initial_state,
        );
        self.events.push(DocEvent::LineCountChanged {
            lines: self.index.line_count(),
        });
        self.emit(DocEvent::InvalidateDirtyLines);
    }

    /// Call into the language plugin, degrading to `default` if it panics.
    fn lang_guarded<T>(&self, default: T, f: impl FnOnce(&dyn Language) -> T) -> T {
        catch_unwind(AssertUnwindSafe(|| f(self.language.as_ref()))).unwrap_or(default)
    }

    fn emit(&mut self, event: DocEvent) {
        // Collapse back-to-back invalidations; everything else is kept.
        if event == DocEvent::InvalidateDirtyLines && self.events.last() == Some(&event) {
            return;
        }
        self.events.push(event);
    }
}

/// Probe window (in characters) for the first balance attempt.
const KISS_PROBE_WINDOW: usize = 1024;

/// Find the character span of `text` covering visual columns
/// `[min_col, max_col)`, with space padding replacing partially covered
/// cells. Returns `(start_char, end_char, pad)` or `None` when the line ends
/// before `min_col`.
fn column_cut(
    text: &str,
    min_col: usize,
    max_col: usize,
    tab_width: usize,
) -> Option<(usize, usize, String)> {
    let mut x = 0usize;
    let mut start: Option<usize> = None;
    let mut end = 0usize;
    let mut left_keep = 0usize;
    let mut right_keep = 0usize;
    for (i, ch) in text.chars().enumerate() {
        let w = device::cell_width_at(ch, x, tab_width);
        let (lo, hi) = (x, x + w);
        x = hi;
        if hi <= min_col {
            continue;
        }
        if lo >= max_col {
            break;
        }
        if start.is_none() {
            start = Some(i);
            left_keep = min_col.saturating_sub(lo);
        }
        end = i + 1;
        right_keep = hi.saturating_sub(max_col);
    }
    let start = start?;
    Some((start, end, " ".repeat(left_keep + right_keep)))
}

/// Where to insert block-pasted text at visual `col` within `text`:
/// `(char_index, chars_to_remove, prefix_spaces, suffix_spaces)`. Only tabs
/// are split; an insertion inside a wide character lands before it.
fn column_insert_point(text: &str, col: usize, tab_width: usize) -> (usize, usize, String, String) {
    let mut x = 0usize;
    for (i, ch) in text.chars().enumerate() {
        let w = device::cell_width_at(ch, x, tab_width);
        let (lo, hi) = (x, x + w);
        x = hi;
        if lo == col {
            return (i, 0, String::new(), String::new());
        }
        if lo < col && col < hi {
            if ch == '\t' {
                return (i, 1, " ".repeat(col - lo), " ".repeat(hi - col));
            }
            return (i, 0, String::new(), String::new());
        }
    }
    (text.chars().count(), 0, String::new(), String::new())
}

/// Convert space runs ending on tab stops into tabs, tracking the visual
/// column from `start_x` and re-synchronizing at each newline.
///
/// A lone space that happens to end on a stop stays a space, so
/// entab-then-detab reproduces the input except for such partial runs.
fn entab_text(text: &str, start_x: usize, tab_width: usize) -> String {
    let tab_width = tab_width.max(1);
    let mut out = String::new();
    let mut x = start_x;
    let mut pending = 0usize;
    for ch in text.chars() {
        match ch {
            ' ' => {
                pending += 1;
                if (x + pending) % tab_width == 0 {
                    if pending > 1 {
                        out.push('\t');
                    } else {
                        out.push(' ');
                    }
                    x += pending;
                    pending = 0;
                }
            }
            '\t' => {
                // A tab swallows any pending spaces before it.
                out.push('\t');
                x += pending;
                x += tab_width - x % tab_width;
                pending = 0;
            }
            '\n' => {
                for _ in 0..pending {
                    out.push(' ');
                }
                pending = 0;
                out.push('\n');
                x = 0;
            }
            _ => {
                for _ in 0..pending {
                    out.push(' ');
                }
                x += pending;
                pending = 0;
                out.push(ch);
                x += device::cell_width_at(ch, x, tab_width);
            }
        }
    }
    for _ in 0..pending {
        out.push(' ');
    }
    out
}

/// Expand every tab into spaces up to the next tab stop, tracking the visual
/// column from `start_x` and re-synchronizing at each newline.
fn detab_text(text: &str, start_x: usize, tab_width: usize) -> String {
    let tab_width = tab_width.max(1);
    let mut out = String::new();
    let mut x = start_x;
    for ch in text.chars() {
        match ch {
            '\t' => {
                let spaces = tab_width - x % tab_width;
                for _ in 0..spaces {
                    out.push(' ');
                }
                x += spaces;
            }
            '\n' => {
                out.push('\n');
                x = 0;
            }
            _ => {
                out.push(ch);
                x += device::cell_width_at(ch, x, tab_width);
            }
        }
    }
    out
}
