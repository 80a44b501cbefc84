//! Per-file persisted editor state.
//!
//! A fixed 36-byte big-endian record a host stashes next to a file (extended
//! attribute, sidecar database) and replays when the file is reopened:
//! selection, scroll position, window geometry, soft-wrap flag, tab width.
//!
//! Decoding is infallible. Records from older versions, truncated blobs, or
//! plain garbage decode to safe defaults field by field; a bad selection is
//! clamped when applied to a document.
//!
//! Layout (offsets in bytes, all integers big-endian):
//!
//! ```text
//!  0  u8   selection kind (0 = stream, 1 = block)
//!  1  u8   soft wrap (0 = off, nonzero = on)
//!  2  u16  tab width (0 = use default)
//!  4  u32  anchor offset        / anchor line
//!  8  u32  caret offset         / anchor column
//! 12  u32  0                    / caret line
//! 16  u32  0                    / caret column
//! 20  u32  scroll x
//! 24  u32  scroll y
//! 28  u16  window left, top, width, height
//! ```

use crate::device::DEFAULT_TAB_WIDTH;
use crate::document::Document;
use crate::selection::Selection;

/// Size of the encoded record.
pub const PERSISTED_STATE_LEN: usize = 36;

/// The state a host persists per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedState {
    /// Selection to restore (clamped against the reopened document).
    pub selection: Selection,
    /// Horizontal scroll position, in host units.
    pub scroll_x: u32,
    /// Vertical scroll position, in host units.
    pub scroll_y: u32,
    /// Window geometry: left, top, width, height.
    pub window: [u16; 4],
    /// Whether soft wrapping was on.
    pub soft_wrap: bool,
    /// Tab width in cells; 0 means "use the default".
    pub tab_width: u16,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            selection: Selection::caret(0),
            scroll_x: 0,
            scroll_y: 0,
            window: [0; 4],
            soft_wrap: false,
            tab_width: DEFAULT_TAB_WIDTH as u16,
        }
    }
}

impl PersistedState {
    /// Encode into the fixed on-disk form.
    pub fn encode(&self) -> [u8; PERSISTED_STATE_LEN] {
        let mut out = [0u8; PERSISTED_STATE_LEN];
        let (kind, fields): (u8, [u32; 4]) = match self.selection {
            Selection::Stream { anchor, caret } => {
                (0, [anchor as u32, caret as u32, 0, 0])
            }
            Selection::Block {
                anchor_line,
                anchor_column,
                caret_line,
                caret_column,
            } => (
                1,
                [
                    anchor_line as u32,
                    anchor_column as u32,
                    caret_line as u32,
                    caret_column as u32,
                ],
            ),
        };
        out[0] = kind;
        out[1] = u8::from(self.soft_wrap);
        out[2..4].copy_from_slice(&self.tab_width.to_be_bytes());
        for (i, field) in fields.iter().enumerate() {
            out[4 + i * 4..8 + i * 4].copy_from_slice(&field.to_be_bytes());
        }
        out[20..24].copy_from_slice(&self.scroll_x.to_be_bytes());
        out[24..28].copy_from_slice(&self.scroll_y.to_be_bytes());
        for (i, dim) in self.window.iter().enumerate() {
            out[28 + i * 2..30 + i * 2].copy_from_slice(&dim.to_be_bytes());
        }
        out
    }

    /// Decode a record. Never fails; missing bytes read as zero.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; PERSISTED_STATE_LEN];
        let take = bytes.len().min(PERSISTED_STATE_LEN);
        buf[..take].copy_from_slice(&bytes[..take]);

        let u16_at = |i: usize| u16::from_be_bytes([buf[i], buf[i + 1]]);
        let u32_at = |i: usize| u32::from_be_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);

        let selection = if buf[0] == 1 {
            Selection::block(
                u32_at(4) as usize,
                u32_at(8) as usize,
                u32_at(12) as usize,
                u32_at(16) as usize,
            )
        } else {
            Selection::stream(u32_at(4) as usize, u32_at(8) as usize)
        };

        Self {
            selection,
            scroll_x: u32_at(20),
            scroll_y: u32_at(24),
            window: [u16_at(28), u16_at(30), u16_at(32), u16_at(34)],
            soft_wrap: buf[1] != 0,
            tab_width: u16_at(2),
        }
    }
}

impl Document {
    /// Capture this document's persistable state, with the host-supplied
    /// scroll position and window geometry folded in.
    pub fn persisted_state(&self, scroll: (u32, u32), window: [u16; 4]) -> PersistedState {
        PersistedState {
            selection: self.selection(),
            scroll_x: scroll.0,
            scroll_y: scroll.1,
            window,
            soft_wrap: self.soft_wrap(),
            tab_width: self.tab_width() as u16,
        }
    }

    /// Reapply a persisted record: tab width, soft wrap, and selection. The
    /// selection is clamped against the current text; scroll and geometry are
    /// the host's to restore.
    pub fn apply_persisted(&mut self, state: &PersistedState) {
        let tab_width = if state.tab_width == 0 {
            DEFAULT_TAB_WIDTH
        } else {
            state.tab_width as usize
        };
        self.set_tab_width(tab_width);
        self.set_soft_wrap(state.soft_wrap);
        self.set_selection(state.selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_state_round_trips() {
        let state = PersistedState {
            selection: Selection::stream(12, 40),
            scroll_x: 3,
            scroll_y: 999,
            window: [10, 20, 640, 480],
            soft_wrap: true,
            tab_width: 8,
        };
        let bytes = state.encode();
        assert_eq!(bytes.len(), PERSISTED_STATE_LEN);
        assert_eq!(PersistedState::decode(&bytes), state);
    }

    #[test]
    fn block_state_round_trips() {
        let state = PersistedState {
            selection: Selection::block(2, 4, 9, 17),
            ..PersistedState::default()
        };
        assert_eq!(PersistedState::decode(&state.encode()), state);
    }

    #[test]
    fn garbage_and_short_input_decode_to_defaults() {
        let decoded = PersistedState::decode(&[]);
        assert_eq!(decoded.selection, Selection::caret(0));
        assert!(!decoded.soft_wrap);
        assert_eq!(decoded.tab_width, 0);

        // An unknown selection kind falls back to stream.
        let mut bytes = [0xffu8; PERSISTED_STATE_LEN];
        bytes[0] = 7;
        let decoded = PersistedState::decode(&bytes);
        assert!(!decoded.selection.is_block());
    }

    #[test]
    fn apply_clamps_against_document() {
        let mut doc = Document::new("short");
        let state = PersistedState {
            selection: Selection::stream(2, 4000),
            soft_wrap: true,
            tab_width: 0,
            ..PersistedState::default()
        };
        doc.apply_persisted(&state);
        assert_eq!(doc.selection(), Selection::stream(2, 5));
        assert!(doc.soft_wrap());
        assert_eq!(doc.tab_width(), DEFAULT_TAB_WIDTH);
    }
}
