//! Stream and rectangular (block) selections.
//!
//! A stream selection is an anchor/caret offset pair. A block selection is a
//! line range crossed with a *visual column* range; columns are screen cells,
//! not character counts, because tabs expand non-uniformly.
//!
//! Selections hold no reference to their document. Every query that needs
//! text or line geometry takes the buffer, line index, and tab width as
//! explicit parameters, so a selection is a plain value that can be stored,
//! compared, and restored (undo does exactly that).

use crate::buffer::TextBuffer;
use crate::device;
use crate::line_index::LineIndex;

/// A document selection. An empty selection is just a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Contiguous character range between `anchor` and `caret` (either order).
    Stream {
        /// Fixed end of the selection.
        anchor: usize,
        /// Moving end of the selection.
        caret: usize,
    },
    /// Rectangle over `[min line..=max line] x [min column..max column)`.
    Block {
        /// Line where the selection was started.
        anchor_line: usize,
        /// Visual column where the selection was started.
        anchor_column: usize,
        /// Line of the moving corner.
        caret_line: usize,
        /// Visual column of the moving corner.
        caret_column: usize,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Self::caret(0)
    }
}

impl Selection {
    /// An empty stream selection at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self::Stream {
            anchor: offset,
            caret: offset,
        }
    }

    /// A stream selection from `anchor` to `caret`.
    pub fn stream(anchor: usize, caret: usize) -> Self {
        Self::Stream { anchor, caret }
    }

    /// A block selection between two line/visual-column corners.
    pub fn block(
        anchor_line: usize,
        anchor_column: usize,
        caret_line: usize,
        caret_column: usize,
    ) -> Self {
        Self::Block {
            anchor_line,
            anchor_column,
            caret_line,
            caret_column,
        }
    }

    /// Returns `true` for a rectangular selection.
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// A stream selection is empty when anchor equals caret; a block
    /// selection when it has zero width.
    pub fn is_empty(&self) -> bool {
        match *self {
            Self::Stream { anchor, caret } => anchor == caret,
            Self::Block {
                anchor_column,
                caret_column,
                ..
            } => anchor_column == caret_column,
        }
    }

    /// The lower visual column of a block selection (0 for stream).
    pub fn min_column(&self) -> usize {
        match *self {
            Self::Stream { .. } => 0,
            Self::Block {
                anchor_column,
                caret_column,
                ..
            } => anchor_column.min(caret_column),
        }
    }

    /// The upper visual column of a block selection (0 for stream).
    pub fn max_column(&self) -> usize {
        match *self {
            Self::Stream { .. } => 0,
            Self::Block {
                anchor_column,
                caret_column,
                ..
            } => anchor_column.max(caret_column),
        }
    }

    /// First line covered by the selection.
    pub fn min_line(&self, index: &LineIndex) -> usize {
        match *self {
            Self::Stream { anchor, caret } => index.offset_to_line(anchor.min(caret)),
            Self::Block {
                anchor_line,
                caret_line,
                ..
            } => anchor_line.min(caret_line),
        }
    }

    /// Last line covered by the selection.
    pub fn max_line(&self, index: &LineIndex) -> usize {
        match *self {
            Self::Stream { anchor, caret } => index.offset_to_line(anchor.max(caret)),
            Self::Block {
                anchor_line,
                caret_line,
                ..
            } => anchor_line.max(caret_line),
        }
    }

    /// Lowest character offset covered by the selection.
    ///
    /// For a block selection this is the top-left corner, resolved against
    /// the top line's text.
    pub fn min_offset(
        &self,
        buffer: &TextBuffer,
        index: &LineIndex,
        tab_width: usize,
    ) -> usize {
        match *self {
            Self::Stream { anchor, caret } => anchor.min(caret),
            Self::Block { .. } => offset_at_column(
                buffer,
                index,
                self.min_line(index),
                self.min_column(),
                tab_width,
            ),
        }
    }

    /// Highest character offset covered by the selection.
    pub fn max_offset(
        &self,
        buffer: &TextBuffer,
        index: &LineIndex,
        tab_width: usize,
    ) -> usize {
        match *self {
            Self::Stream { anchor, caret } => anchor.max(caret),
            Self::Block { .. } => offset_at_column(
                buffer,
                index,
                self.max_line(index),
                self.max_column(),
                tab_width,
            ),
        }
    }

    /// Expand to whole lines: from the start of the first covered line to the
    /// start of the line after the last covered one (or the buffer end).
    pub fn select_lines(&self, buffer: &TextBuffer, index: &LineIndex) -> Selection {
        let first = self.min_line(index);
        let last = self.max_line(index);
        let start = index.line_start(first);
        let end = if last + 1 < index.line_count() {
            index.line_start(last + 1)
        } else {
            buffer.len()
        };
        Selection::stream(start, end)
    }

    /// The rectangle's text, one entry per covered line.
    ///
    /// Lines shorter than the column range are padded with spaces, so every
    /// entry has the same visual width. Stream selections get their plain
    /// text as a single entry.
    pub fn block_lines(
        &self,
        buffer: &TextBuffer,
        index: &LineIndex,
        tab_width: usize,
    ) -> Vec<String> {
        match *self {
            Self::Stream { anchor, caret } => {
                let (start, end) = (anchor.min(caret), anchor.max(caret));
                vec![buffer.text_in(start, end - start)]
            }
            Self::Block { .. } => {
                let (min_col, max_col) = (self.min_column(), self.max_column());
                (self.min_line(index)..=self.max_line(index))
                    .map(|line| {
                        column_slice(
                            &index.line_text(buffer, line),
                            min_col,
                            max_col,
                            tab_width,
                        )
                    })
                    .collect()
            }
        }
    }
}

/// Character offset of visual column `column` on `line`, clamped to the line
/// end. When `column` lands inside a tab or wide character, the offset of
/// that character is returned.
pub fn offset_at_column(
    buffer: &TextBuffer,
    index: &LineIndex,
    line: usize,
    column: usize,
    tab_width: usize,
) -> usize {
    let text = index.line_text(buffer, line);
    let (col, _) = device::column_for_visual_x(&text, column, tab_width);
    index.line_start(line) + col
}

/// Line and visual column of `offset`.
pub fn position_of_offset(
    buffer: &TextBuffer,
    index: &LineIndex,
    offset: usize,
    tab_width: usize,
) -> (usize, usize) {
    let line = index.offset_to_line(offset.min(buffer.len()));
    let start = index.line_start(line);
    let text = index.line_text(buffer, line);
    let column = device::visual_x_for_column(&text, offset.saturating_sub(start), tab_width);
    (line, column)
}

/// The visual-column slice `[min_col, max_col)` of `text`, space-padded:
/// covered tab cells and partially covered wide characters become spaces,
/// and short lines are padded out to `max_col`, so every extracted line has
/// the same visual width.
fn column_slice(text: &str, min_col: usize, max_col: usize, tab_width: usize) -> String {
    let mut out = String::new();
    let mut x = 0usize;
    for ch in text.chars() {
        let w = device::cell_width_at(ch, x, tab_width);
        let (lo, hi) = (x, x + w);
        x = hi;
        if hi <= min_col {
            continue;
        }
        if lo >= max_col {
            break;
        }
        if ch != '\t' && lo >= min_col && hi <= max_col {
            out.push(ch);
        } else {
            // A tab, or a wide character cut by the rectangle edge: the
            // covered cells become spaces.
            let covered = hi.min(max_col) - lo.max(min_col);
            for _ in 0..covered {
                out.push(' ');
            }
        }
    }
    while x < max_col {
        out.push(' ');
        x += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MonospaceDevice;
    use crate::line_index::WrapConfig;
    use doc_engine_lang::PlainText;

    fn fixture(text: &str) -> (TextBuffer, LineIndex) {
        let buffer = TextBuffer::new(text);
        let index = LineIndex::build(
            &buffer,
            &PlainText::new(),
            &MonospaceDevice,
            &WrapConfig::default(),
            0,
        );
        (buffer, index)
    }

    #[test]
    fn stream_extents() {
        let (buffer, index) = fixture("ab\ncd\nef");
        let sel = Selection::stream(7, 1);
        assert!(!sel.is_empty());
        assert_eq!(sel.min_offset(&buffer, &index, 4), 1);
        assert_eq!(sel.max_offset(&buffer, &index, 4), 7);
        assert_eq!(sel.min_line(&index), 0);
        assert_eq!(sel.max_line(&index), 2);
    }

    #[test]
    fn caret_is_empty() {
        assert!(Selection::caret(3).is_empty());
        assert!(Selection::block(0, 2, 2, 2).is_empty());
        assert!(!Selection::block(0, 2, 2, 5).is_empty());
    }

    #[test]
    fn select_lines_expands_to_line_boundaries() {
        let (buffer, index) = fixture("ab\ncd\nef");
        let sel = Selection::stream(4, 4).select_lines(&buffer, &index);
        assert_eq!(sel, Selection::stream(3, 6));

        // Last line has no trailing newline; expansion stops at buffer end.
        let sel = Selection::caret(7).select_lines(&buffer, &index);
        assert_eq!(sel, Selection::stream(6, 8));
    }

    #[test]
    fn block_corners_resolve_against_line_text() {
        let (buffer, index) = fixture("abcdef\nxy\nlonger");
        let sel = Selection::block(0, 2, 2, 5);
        assert_eq!(sel.min_offset(&buffer, &index, 4), 2);
        // Column 5 on "longer" is character 5.
        assert_eq!(sel.max_offset(&buffer, &index, 4), 15);
    }

    #[test]
    fn block_lines_pad_short_lines() {
        let (buffer, index) = fixture("abcdef\nxy\nlonger");
        let sel = Selection::block(0, 2, 2, 5);
        assert_eq!(sel.block_lines(&buffer, &index, 4), vec!["cde", "   ", "nge"]);
    }

    #[test]
    fn block_lines_split_tabs_into_spaces() {
        // Tab at column 1 spans columns 1..4 (tab width 4).
        let (buffer, index) = fixture("a\tb");
        let sel = Selection::block(0, 0, 0, 3);
        assert_eq!(sel.block_lines(&buffer, &index, 4), vec!["a  "]);
    }

    #[test]
    fn position_round_trip_over_tabs() {
        let (buffer, index) = fixture("a\tbc\nxy");
        // 'b' sits at offset 2, visual column 4.
        assert_eq!(position_of_offset(&buffer, &index, 2, 4), (0, 4));
        assert_eq!(offset_at_column(&buffer, &index, 0, 4, 4), 2);
        // Inside the tab's span, the tab's own offset comes back.
        assert_eq!(offset_at_column(&buffer, &index, 0, 2, 4), 1);
    }
}
