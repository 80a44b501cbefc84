//! The line index and incremental rewrap engine.
//!
//! A flat array of [`LineInfo`] entries maps visual line numbers to buffer
//! offsets, carrying the lexer state at each line start plus wrap and dirty
//! flags. The array ends in a synthetic sentinel whose start is the buffer
//! length plus one, so line text lengths are uniform arithmetic.
//!
//! Rewrapping the whole buffer on every keystroke is too slow. [`rewrap`]
//! limits re-tokenization to the soft-wrap paragraph around the edit, then
//! resumes the old entries (shifted by the edit's length delta) once line
//! boundaries and lexer state both line up again.
//!
//! [`rewrap`]: LineIndex::rewrap

use crate::buffer::TextBuffer;
use crate::device::{self, Device};
use doc_engine_lang::{Language, StyleRun};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Metadata for one visual line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    /// Character offset of the line start.
    pub start: usize,
    /// Lexer state at the line start (opaque to the engine).
    pub state: u16,
    /// `true` when the line ends at a real `'\n'` (or the buffer end).
    pub hard_break: bool,
    /// `true` when the line is a soft-wrap continuation of the previous one.
    pub continuation: bool,
    /// Host-visible [`LineFlag`] bits. They survive rewrap of their paragraph.
    pub flags: u8,
    /// The cached style/geometry for this line is stale.
    pub dirty: bool,
}

impl LineInfo {
    /// Returns `true` if this line carries `flag`.
    pub fn has_flag(&self, flag: LineFlag) -> bool {
        self.flags & flag.bit() != 0
    }
}

/// A host-visible per-line flag. The engine only stores these; what they mean
/// (bookmark gutter icon, debugger stop, diff gutter color) is up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFlag {
    /// Bookmark set by the user.
    Marked,
    /// The line begins an executable statement.
    Statement,
    /// A breakpoint is set on the line.
    Breakpoint,
    /// The line differs from the on-disk baseline.
    DiffMarker,
}

impl LineFlag {
    fn bit(self) -> u8 {
        match self {
            LineFlag::Marked => 1,
            LineFlag::Statement => 1 << 1,
            LineFlag::Breakpoint => 1 << 2,
            LineFlag::DiffMarker => 1 << 3,
        }
    }
}

/// A buffer mutation the line index must be repaired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// `len` characters were inserted at `offset`.
    Insert {
        /// Character offset of the insertion.
        offset: usize,
        /// Inserted length in characters.
        len: usize,
    },
    /// `len` characters were deleted at `offset`.
    Delete {
        /// Character offset of the deletion.
        offset: usize,
        /// Deleted length in characters.
        len: usize,
    },
}

/// Wrapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapConfig {
    /// Tab width in cells. Values below 1 disable soft wrapping.
    pub tab_width: usize,
    /// Soft-wrap width budget in cells; `None` (or 0) disables soft wrapping.
    pub wrap_width: Option<usize>,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            tab_width: device::DEFAULT_TAB_WIDTH,
            wrap_width: None,
        }
    }
}

impl WrapConfig {
    /// The effective wrap width, `None` when wrapping is degenerate/disabled.
    fn effective_wrap_width(&self) -> Option<usize> {
        if self.tab_width == 0 {
            return None;
        }
        self.wrap_width.filter(|w| *w > 0)
    }
}

/// Style a line through the plugin, degrading to plain on a plugin panic.
pub(crate) fn style_guarded(
    lang: &dyn Language,
    text: &str,
    state: u16,
) -> (Vec<StyleRun>, u16) {
    match catch_unwind(AssertUnwindSafe(|| lang.style_line(text, state))) {
        Ok(result) => result,
        Err(_) => {
            let len = text.chars().count();
            let runs = if len == 0 {
                Vec::new()
            } else {
                vec![StyleRun::new(len, doc_engine_lang::STYLE_PLAIN)]
            };
            (runs, state)
        }
    }
}

/// The line index: visual line number ↔ character offset.
pub struct LineIndex {
    /// Real lines followed by one sentinel entry.
    lines: Vec<LineInfo>,
}

impl LineIndex {
    /// Build a fresh index over `buffer`.
    pub fn build(
        buffer: &TextBuffer,
        lang: &dyn Language,
        device: &dyn Device,
        cfg: &WrapConfig,
        initial_state: u16,
    ) -> Self {
        let mut lines = Vec::new();
        let mut offset = 0usize;
        let mut state = initial_state;
        loop {
            let (next, next_state) =
                emit_hard_line(buffer, lang, device, cfg, offset, state, &mut lines);
            match next {
                Some(n) => {
                    offset = n;
                    state = next_state;
                }
                None => break,
            }
        }
        lines.push(sentinel(buffer.len()));
        Self { lines }
    }

    /// Number of visual lines (at least 1, even for an empty buffer).
    pub fn line_count(&self) -> usize {
        self.lines.len() - 1
    }

    /// Character offset of the start of `line` (clamped to the last line).
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.line_count().saturating_sub(1));
        self.lines[line].start
    }

    /// Character length of `line`'s text, excluding any trailing newline.
    pub fn line_text_len(&self, line: usize) -> usize {
        let line = line.min(self.line_count().saturating_sub(1));
        let info = self.lines[line];
        let next = self.lines[line + 1].start;
        next - info.start - usize::from(info.hard_break)
    }

    /// The text of `line`, excluding any trailing newline.
    pub fn line_text(&self, buffer: &TextBuffer, line: usize) -> String {
        buffer.text_in(self.line_start(line), self.line_text_len(line))
    }

    /// Metadata for `line`, if in bounds.
    pub fn line_info(&self, line: usize) -> Option<&LineInfo> {
        if line < self.line_count() {
            Some(&self.lines[line])
        } else {
            None
        }
    }

    /// The line containing `offset`: the last line whose start is `<= offset`.
    pub fn offset_to_line(&self, offset: usize) -> usize {
        let count = self.line_count();
        let idx = self.lines[..count].partition_point(|l| l.start <= offset);
        idx.saturating_sub(1)
    }

    /// Returns `true` if `line` needs restyling/redraw.
    pub fn is_dirty(&self, line: usize) -> bool {
        self.line_info(line).is_some_and(|l| l.dirty)
    }

    /// Mark a half-open line range dirty.
    pub fn mark_dirty(&mut self, from: usize, to: usize) {
        let to = to.min(self.line_count());
        for line in &mut self.lines[from.min(to)..to] {
            line.dirty = true;
        }
    }

    /// Mark every line dirty (e.g. after a language or tab-width change).
    pub fn mark_all_dirty(&mut self) {
        let count = self.line_count();
        self.mark_dirty(0, count);
    }

    /// Clear all dirty flags (after the host has redrawn).
    pub fn clear_dirty(&mut self) {
        for line in &mut self.lines {
            line.dirty = false;
        }
    }

    /// Returns `true` if `line` carries `flag`.
    pub fn has_flag(&self, line: usize, flag: LineFlag) -> bool {
        self.line_info(line).is_some_and(|l| l.has_flag(flag))
    }

    /// Set or clear `flag` on `line`.
    pub fn set_flag(&mut self, line: usize, flag: LineFlag, on: bool) {
        if line < self.line_count() {
            if on {
                self.lines[line].flags |= flag.bit();
            } else {
                self.lines[line].flags &= !flag.bit();
            }
        }
    }

    /// Returns `true` if `line` carries a marker (bookmark).
    pub fn is_marked(&self, line: usize) -> bool {
        self.has_flag(line, LineFlag::Marked)
    }

    /// Set or clear the marker on `line`.
    pub fn set_marked(&mut self, line: usize, marked: bool) {
        self.set_flag(line, LineFlag::Marked, marked);
    }

    /// Repair the index after `edit` was applied to `buffer`.
    ///
    /// Re-tokenizes from the head of the soft-wrap paragraph covering the edit
    /// and stops once re-emitted line boundaries and lexer state align with
    /// the surviving tail. Returns the signed change in line count.
    pub fn rewrap(
        &mut self,
        buffer: &TextBuffer,
        lang: &dyn Language,
        device: &dyn Device,
        cfg: &WrapConfig,
        edit: Edit,
    ) -> i64 {
        let count = self.line_count();
        let (edit_start, old_end, delta) = match edit {
            Edit::Insert { offset, len } => (offset, offset, len as i64),
            Edit::Delete { offset, len } => (offset, offset + len, -(len as i64)),
        };

        // 1. First affected line, extended back to the paragraph head.
        let mut first = self.offset_to_line(edit_start);
        while first > 0 && self.lines[first].continuation {
            first -= 1;
        }

        // 2. First surviving paragraph head strictly past the edited span.
        let mut resume = first + 1;
        while resume < count
            && (self.lines[resume].start <= old_end || self.lines[resume].continuation)
        {
            resume += 1;
        }

        let shifted = |start: usize| -> usize { (start as i64 + delta).max(0) as usize };

        // Remember host flags on lines inside the span being regenerated.
        let mut kept_flags: Vec<(usize, u8)> = Vec::new();
        for info in &self.lines[first..resume] {
            if info.flags != 0 {
                let adjusted = if info.start > old_end {
                    shifted(info.start)
                } else {
                    info.start.min(edit_start)
                };
                kept_flags.push((adjusted, info.flags));
            }
        }

        // 3. Re-tokenize forward from the paragraph head.
        let mut new_entries: Vec<LineInfo> = Vec::new();
        let mut offset = self.lines[first].start;
        let mut state = self.lines[first].state;
        loop {
            if resume < count && shifted(self.lines[resume].start) == offset {
                if state == self.lines[resume].state {
                    break;
                }
                // Lexer state leaked past the edit (e.g. an unterminated block
                // comment): keep re-tokenizing through the next paragraph.
                resume += 1;
                while resume < count && self.lines[resume].continuation {
                    resume += 1;
                }
            }

            let (next, next_state) =
                emit_hard_line(buffer, lang, device, cfg, offset, state, &mut new_entries);
            match next {
                Some(n) => {
                    offset = n;
                    state = next_state;
                }
                None => {
                    resume = count;
                    break;
                }
            }
        }

        // 4. Splice, shift the surviving tail, and refresh the sentinel.
        let new_len = new_entries.len();
        let new_count_delta = new_len as i64 - (resume - first) as i64;
        self.lines.splice(first..resume, new_entries);
        let count = self.line_count();
        for info in &mut self.lines[(first + new_len).min(count)..count] {
            info.start = shifted(info.start);
        }
        *self.lines.last_mut().expect("sentinel") = sentinel(buffer.len());

        for (offset, flags) in kept_flags {
            let line = self.offset_to_line(offset.min(buffer.len()));
            self.lines[line].flags |= flags;
        }

        new_count_delta
    }
}

fn sentinel(buffer_len: usize) -> LineInfo {
    LineInfo {
        start: buffer_len + 1,
        state: 0,
        hard_break: false,
        continuation: false,
        flags: 0,
        dirty: false,
    }
}

/// Tokenize one hard line starting at `start`, emitting one entry per visual
/// segment. Returns the start of the next hard line (`None` at buffer end)
/// and the lexer state it begins with.
fn emit_hard_line(
    buffer: &TextBuffer,
    lang: &dyn Language,
    device: &dyn Device,
    cfg: &WrapConfig,
    start: usize,
    entry_state: u16,
    out: &mut Vec<LineInfo>,
) -> (Option<usize>, u16) {
    let newline = buffer.next_newline(start);
    let text_end = newline.unwrap_or_else(|| buffer.len());
    let text = buffer.text_in(start, text_end - start);
    let (_, next_state) = style_guarded(lang, &text, entry_state);

    // Segment starts within the hard line, in characters.
    let mut seg_starts: Vec<usize> = vec![0];
    if let Some(width) = cfg.effective_wrap_width() {
        let prefix_len = text.len() - text.trim_start_matches([' ', '\t']).len();
        let cont_indent = device::str_width(&text[..prefix_len], cfg.tab_width)
            .min(width.saturating_sub(1));

        let mut consumed_chars = 0usize;
        let mut rest: &str = &text;
        loop {
            let indent = if consumed_chars == 0 { 0 } else { cont_indent };
            let Some(brk) = device.break_line(rest, width, cfg.tab_width, indent) else {
                break;
            };
            consumed_chars += brk;
            seg_starts.push(consumed_chars);
            let byte_brk = rest
                .char_indices()
                .nth(brk)
                .map(|(b, _)| b)
                .unwrap_or(rest.len());
            rest = &rest[byte_brk..];
            if rest.is_empty() {
                seg_starts.pop();
                break;
            }
        }
    }

    let last = seg_starts.len() - 1;
    for (i, seg) in seg_starts.iter().enumerate() {
        out.push(LineInfo {
            start: start + seg,
            state: entry_state,
            hard_break: i == last,
            continuation: i > 0,
            flags: 0,
            dirty: true,
        });
    }

    (newline.map(|n| n + 1), next_state)
}
