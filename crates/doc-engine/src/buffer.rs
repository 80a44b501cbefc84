//! The text buffer: character storage, encoding, and cursor walks.
//!
//! Backed by a [`ropey::Rope`], so insert/delete and offset lookups stay
//! O(log n) on large documents. All offsets in this module are **character
//! offsets** (Unicode scalar values); a character offset can never land inside
//! a multi-byte UTF-8 sequence, which is the boundary guarantee the rest of
//! the engine relies on.
//!
//! The buffer is deliberately a dumb, fast primitive: mutations never touch
//! the line index. Repairing derived state is the document's responsibility.

use crate::line_ending::{Encoding, LineEnding};
use crate::search::{self, PatternError, SearchMatch, SearchOptions};
use ropey::Rope;
use unicode_segmentation::UnicodeSegmentation;

/// Cursor motion granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One Unicode scalar value.
    Character,
    /// One word (runs of word characters, skipping intervening whitespace).
    Word,
}

/// Search / scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the end of the buffer.
    Forward,
    /// Toward the start of the buffer.
    Backward,
}

/// Coarse character classes used for word-boundary walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Space,
    Punct,
}

fn class_of(ch: char) -> CharClass {
    if ch == '_' || ch.is_alphanumeric() {
        CharClass::Word
    } else if ch.is_whitespace() {
        CharClass::Space
    } else {
        CharClass::Punct
    }
}

/// The character data of one document.
pub struct TextBuffer {
    rope: Rope,
    encoding: Encoding,
    line_ending: LineEnding,
}

impl TextBuffer {
    /// Create a buffer from source text.
    ///
    /// CRLF newlines are normalized to LF; the detected convention is kept so
    /// the host can reapply it on save.
    pub fn new(text: &str) -> Self {
        let line_ending = LineEnding::detect_in_text(text);
        let normalized = LineEnding::normalize(text);
        Self {
            rope: Rope::from_str(&normalized),
            encoding: Encoding::Utf8,
            line_ending,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Total length in characters.
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// The declared encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Set the declared encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// The preferred line ending convention for saving.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Set the preferred line ending convention.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    /// Insert `text` at `offset` (clamped to the buffer length).
    pub fn insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let offset = offset.min(self.len());
        self.rope.insert(offset, text);
    }

    /// Delete `len` characters starting at `offset` (clamped).
    pub fn delete(&mut self, offset: usize, len: usize) {
        let start = offset.min(self.len());
        let end = offset.saturating_add(len).min(self.len());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Extract `len` characters starting at `offset` (clamped).
    pub fn text_in(&self, offset: usize, len: usize) -> String {
        let start = offset.min(self.len());
        let end = offset.saturating_add(len).min(self.len());
        self.rope.slice(start..end).to_string()
    }

    /// The whole buffer as a `String` (internal LF form).
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Offset of the first `'\n'` at or after `from`, if any.
    pub fn next_newline(&self, from: usize) -> Option<usize> {
        if from >= self.len() {
            return None;
        }
        let line = self.rope.char_to_line(from);
        if line + 1 < self.rope.len_lines() {
            Some(self.rope.line_to_char(line + 1) - 1)
        } else {
            None
        }
    }

    /// The character at `offset`, if in bounds.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset < self.len() {
            Some(self.rope.char(offset))
        } else {
            None
        }
    }

    /// The next cursor position after `offset` at the given granularity.
    pub fn next_cursor_position(&self, offset: usize, granularity: Granularity) -> usize {
        let len = self.len();
        let offset = offset.min(len);
        match granularity {
            Granularity::Character => (offset + 1).min(len),
            Granularity::Word => {
                let mut pos = offset;
                if pos >= len {
                    return len;
                }
                let start_class = class_of(self.rope.char(pos));
                if start_class != CharClass::Space {
                    while pos < len && class_of(self.rope.char(pos)) == start_class {
                        pos += 1;
                    }
                }
                while pos < len && class_of(self.rope.char(pos)) == CharClass::Space {
                    pos += 1;
                }
                pos
            }
        }
    }

    /// The previous cursor position before `offset` at the given granularity.
    pub fn prev_cursor_position(&self, offset: usize, granularity: Granularity) -> usize {
        let offset = offset.min(self.len());
        match granularity {
            Granularity::Character => offset.saturating_sub(1),
            Granularity::Word => {
                let mut pos = offset;
                while pos > 0 && class_of(self.rope.char(pos - 1)) == CharClass::Space {
                    pos -= 1;
                }
                if pos == 0 {
                    return 0;
                }
                let target = class_of(self.rope.char(pos - 1));
                while pos > 0 && class_of(self.rope.char(pos - 1)) == target {
                    pos -= 1;
                }
                pos
            }
        }
    }

    /// Search for `pattern` starting at `from`.
    ///
    /// A malformed regex pattern fails with [`PatternError`]; callers treat
    /// that the same as no match.
    pub fn find(
        &self,
        from: usize,
        pattern: &str,
        direction: Direction,
        options: SearchOptions,
    ) -> Result<Option<SearchMatch>, PatternError> {
        let text = self.text();
        match direction {
            Direction::Forward => search::find_next(&text, pattern, options, from),
            Direction::Backward => search::find_prev(&text, pattern, options, from),
        }
    }

    /// Collect distinct words beginning with `prefix`, ordered by proximity to
    /// `from` in the scan `direction` (wrapping around the buffer).
    ///
    /// Used by word completion; the word exactly at the caret is the caller's
    /// problem to exclude.
    pub fn words_beginning_with(
        &self,
        from: usize,
        direction: Direction,
        prefix: &str,
    ) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }

        let text = self.text();
        let mut words: Vec<(usize, String)> = Vec::new();
        for (byte_start, word) in text.unicode_word_indices() {
            if word.starts_with(prefix) && word != prefix {
                let char_start = text[..byte_start].chars().count();
                words.push((char_start, word.to_string()));
            }
        }

        // Rotate so the first candidate is the nearest one in `direction`.
        let pivot = words.partition_point(|(start, _)| *start < from);
        let mut ordered: Vec<String> = Vec::with_capacity(words.len());
        let push_unique = |ordered: &mut Vec<String>, w: &str| {
            if !ordered.iter().any(|o| o == w) {
                ordered.push(w.to_string());
            }
        };
        match direction {
            Direction::Forward => {
                for (_, w) in words[pivot..].iter().chain(words[..pivot].iter()) {
                    push_unique(&mut ordered, w);
                }
            }
            Direction::Backward => {
                for (_, w) in words[..pivot].iter().rev().chain(words[pivot..].iter().rev()) {
                    push_unique(&mut ordered, w);
                }
            }
        }
        ordered
    }

    /// FNV-1a hash of a character range, for host-side diff and dedup.
    pub fn hash_line(&self, offset: usize, len: usize) -> u32 {
        const FNV_OFFSET: u32 = 0x811c_9dc5;
        const FNV_PRIME: u32 = 0x0100_0193;

        let mut hash = FNV_OFFSET;
        let mut utf8 = [0u8; 4];
        let start = offset.min(self.len());
        let end = offset.saturating_add(len).min(self.len());
        for ch in self.rope.slice(start..end).chars() {
            for &byte in ch.encode_utf8(&mut utf8).as_bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        hash
    }
}
