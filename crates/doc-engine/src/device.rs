//! Device metrics: the measurement contract behind soft wrapping.
//!
//! The rewrap engine never measures text itself; it asks a [`Device`] where a
//! line may break within a cell budget. [`MonospaceDevice`] is the built-in
//! implementation: one cell per narrow character, two for wide (UAX #11 via
//! `unicode-width`), with tabs expanding to the next tab stop.

use unicode_width::UnicodeWidthChar;

/// Default tab width (in cells) when a document does not configure one.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Visual width of `ch` at cell offset `x` within its line.
///
/// Tabs advance to the next tab stop; everything else follows UAX #11.
pub fn cell_width_at(ch: char, x: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - (x % tab_width)
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(1)
    }
}

/// Visual cell offset of character `column` within `line`.
pub fn visual_x_for_column(line: &str, column: usize, tab_width: usize) -> usize {
    let mut x = 0usize;
    for ch in line.chars().take(column) {
        x = x.saturating_add(cell_width_at(ch, x, tab_width));
    }
    x
}

/// Total visual width of `line` in cells.
pub fn str_width(line: &str, tab_width: usize) -> usize {
    let mut x = 0usize;
    for ch in line.chars() {
        x = x.saturating_add(cell_width_at(ch, x, tab_width));
    }
    x
}

/// Character column whose cell range covers visual offset `x` in `line`.
///
/// Returns `(column, exact)`: `exact` is `false` when `x` falls inside a
/// multi-cell character (a tab or a wide character), in which case `column`
/// is that character's column.
pub fn column_for_visual_x(line: &str, x: usize, tab_width: usize) -> (usize, bool) {
    let mut cell = 0usize;
    for (column, ch) in line.chars().enumerate() {
        if cell == x {
            return (column, true);
        }
        let w = cell_width_at(ch, cell, tab_width);
        if cell + w > x {
            return (column, false);
        }
        cell += w;
    }
    (line.chars().count(), cell == x)
}

/// Text measurement supplied by the host's rendering layer.
///
/// Consumed only by the rewrap engine and screen-position conversions; the
/// rest of the engine is metrics-free.
pub trait Device {
    /// Height of one visual line, in device units.
    fn line_height(&self) -> usize {
        1
    }

    /// Width of `ch` at cell offset `x`, honoring tab stops.
    fn char_width(&self, ch: char, x: usize, tab_width: usize) -> usize;

    /// Choose a break for `text` within `budget` cells.
    ///
    /// `indent` is the cell indent already consumed by a continuation line.
    /// Returns the character index where the next segment starts, preferring
    /// the last whitespace boundary that fits; when no boundary fits, breaks
    /// mid-word (never at index 0, so wrapping always terminates). Returns
    /// `None` when the whole text fits.
    fn break_line(&self, text: &str, budget: usize, tab_width: usize, indent: usize)
    -> Option<usize>;
}

/// The built-in monospace text-grid device.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceDevice;

impl Device for MonospaceDevice {
    fn char_width(&self, ch: char, x: usize, tab_width: usize) -> usize {
        cell_width_at(ch, x, tab_width)
    }

    fn break_line(
        &self,
        text: &str,
        budget: usize,
        tab_width: usize,
        indent: usize,
    ) -> Option<usize> {
        if budget == 0 {
            return None;
        }

        let mut x = indent;
        let mut last_boundary: Option<usize> = None;
        for (index, ch) in text.chars().enumerate() {
            let w = self.char_width(ch, x, tab_width);
            if x.saturating_add(w) > budget && index > 0 {
                return Some(match last_boundary {
                    Some(boundary) if boundary > 0 => boundary,
                    _ => index,
                });
            }
            x = x.saturating_add(w);
            if ch.is_whitespace() {
                last_boundary = Some(index + 1);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_expands_to_next_stop() {
        assert_eq!(cell_width_at('\t', 0, 4), 4);
        assert_eq!(cell_width_at('\t', 3, 4), 1);
        assert_eq!(cell_width_at('\t', 4, 4), 4);
        assert_eq!(str_width("ab\tc", 4), 5);
    }

    #[test]
    fn wide_characters_take_two_cells() {
        assert_eq!(cell_width_at('你', 0, 4), 2);
        assert_eq!(visual_x_for_column("你a", 1, 4), 2);
        assert_eq!(visual_x_for_column("你a", 2, 4), 3);
    }

    #[test]
    fn column_for_visual_x_round_trips() {
        let line = "a\tbc";
        assert_eq!(column_for_visual_x(line, 0, 4), (0, true));
        assert_eq!(column_for_visual_x(line, 1, 4), (1, true));
        // Inside the tab's span.
        assert_eq!(column_for_visual_x(line, 2, 4), (1, false));
        assert_eq!(column_for_visual_x(line, 4, 4), (2, true));
        assert_eq!(column_for_visual_x(line, 99, 4), (4, false));
    }

    #[test]
    fn break_prefers_word_boundary() {
        let device = MonospaceDevice;
        // "hello w" would fit in 7 cells, but the boundary after "hello " wins.
        assert_eq!(device.break_line("hello world", 7, 4, 0), Some(6));
        assert_eq!(device.break_line("hello", 7, 4, 0), None);
    }

    #[test]
    fn break_without_boundary_splits_word() {
        let device = MonospaceDevice;
        assert_eq!(device.break_line("abcdefgh", 5, 4, 0), Some(5));
        // A budget narrower than any character still makes progress.
        assert_eq!(device.break_line("你好", 1, 4, 0), Some(1));
    }

    #[test]
    fn continuation_indent_shrinks_budget() {
        let device = MonospaceDevice;
        assert_eq!(device.break_line("abcdefgh", 5, 4, 2), Some(3));
    }
}
