//! Text search primitives.
//!
//! Free functions over a UTF-8 `&str`, using **character offsets** for all
//! public inputs and outputs. Literal queries are escaped and compiled into a
//! regex so both modes share one engine; a malformed pattern surfaces as
//! [`PatternError`], which callers treat as "no match".

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    /// If `true`, matches case-insensitively.
    pub ignore_case: bool,
    /// If `true`, treats the query as a regex pattern.
    pub is_regex: bool,
}

/// A match, expressed as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A search pattern failed to compile.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The provided regex pattern is malformed.
    #[error("invalid search pattern: {0}")]
    Invalid(#[from] regex::Error),
}

/// Mapping between character offsets and byte offsets of one text snapshot.
#[derive(Debug)]
pub(crate) struct OffsetMap {
    boundaries: Vec<usize>,
}

impl OffsetMap {
    pub(crate) fn new(text: &str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());
        Self { boundaries }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub(crate) fn byte_of_char(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.boundaries[clamped]
    }

    pub(crate) fn char_of_byte(&self, byte_offset: usize) -> usize {
        match self.boundaries.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        }
    }
}

pub(crate) fn compile(pattern: &str, options: SearchOptions) -> Result<Regex, PatternError> {
    let source = if options.is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };

    Ok(RegexBuilder::new(&source)
        .case_insensitive(options.ignore_case)
        .multi_line(true)
        .build()?)
}

/// Find the next occurrence of `pattern`, searching forward from `from`.
///
/// Empty patterns and empty matches never succeed.
pub fn find_next(
    text: &str,
    pattern: &str,
    options: SearchOptions,
    from: usize,
) -> Result<Option<SearchMatch>, PatternError> {
    if pattern.is_empty() {
        return Ok(None);
    }

    let re = compile(pattern, options)?;
    let map = OffsetMap::new(text);

    let mut start_char = from.min(map.char_count());
    loop {
        let Some(m) = re.find_at(text, map.byte_of_char(start_char)) else {
            return Ok(None);
        };

        let found = SearchMatch {
            start: map.char_of_byte(m.start()),
            end: map.char_of_byte(m.end()),
        };

        // Zero-width matches would loop forever; step past them.
        if found.is_empty() {
            if found.end >= map.char_count() {
                return Ok(None);
            }
            start_char = found.end + 1;
            continue;
        }

        return Ok(Some(found));
    }
}

/// Find the last occurrence of `pattern` strictly before `before`.
pub fn find_prev(
    text: &str,
    pattern: &str,
    options: SearchOptions,
    before: usize,
) -> Result<Option<SearchMatch>, PatternError> {
    if pattern.is_empty() {
        return Ok(None);
    }

    let re = compile(pattern, options)?;
    let map = OffsetMap::new(text);
    let limit = map.byte_of_char(before.min(map.char_count()));

    let mut last: Option<SearchMatch> = None;
    for m in re.find_iter(&text[..limit]) {
        let found = SearchMatch {
            start: map.char_of_byte(m.start()),
            end: map.char_of_byte(m.end()),
        };
        if !found.is_empty() {
            last = Some(found);
        }
    }

    Ok(last)
}

/// Find all occurrences of `pattern` in `text`, left to right.
pub fn find_all(
    text: &str,
    pattern: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, PatternError> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }

    let re = compile(pattern, options)?;
    let map = OffsetMap::new(text);

    let mut matches = Vec::new();
    for m in re.find_iter(text) {
        let found = SearchMatch {
            start: map.char_of_byte(m.start()),
            end: map.char_of_byte(m.end()),
        };
        if !found.is_empty() {
            matches.push(found);
        }
    }

    Ok(matches)
}

/// Produce the replacement text for the match at `m`.
///
/// With `options.is_regex`, `template` may reference capture groups (`$1`,
/// `$name`); otherwise it is taken literally.
pub fn replacement_for(
    text: &str,
    pattern: &str,
    options: SearchOptions,
    m: SearchMatch,
    template: &str,
) -> Result<String, PatternError> {
    if !options.is_regex {
        return Ok(template.to_string());
    }

    let re = compile(pattern, options)?;
    let map = OffsetMap::new(text);
    let start_byte = map.byte_of_char(m.start);

    if let Some(caps) = re.captures_at(text, start_byte)
        && let Some(whole) = caps.get(0)
        && whole.start() == start_byte
    {
        let mut out = String::new();
        caps.expand(template, &mut out);
        return Ok(out);
    }

    // The stored match no longer matches (stale offsets); fall back to the
    // template verbatim rather than corrupting surrounding text.
    Ok(template.to_string())
}

/// Incremental ("fast find") search state.
///
/// The query is grown one keystroke at a time; every change re-searches from
/// the remembered origin so the live match walks forward as the query gets
/// more specific. Dropping a character removes one full Unicode codepoint.
#[derive(Debug, Clone)]
pub struct FastFind {
    origin: usize,
    query: String,
    options: SearchOptions,
}

impl FastFind {
    /// Start an incremental search anchored at `origin`.
    pub fn new(origin: usize, options: SearchOptions) -> Self {
        Self {
            origin,
            query: String::new(),
            options,
        }
    }

    /// The live query string.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The remembered search origin.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Extend the query by one character and re-search from the origin.
    pub fn push_char(&mut self, ch: char, text: &str) -> Option<SearchMatch> {
        self.query.push(ch);
        self.search(text)
    }

    /// Remove one full codepoint from the query and re-search from the origin.
    pub fn pop_char(&mut self, text: &str) -> Option<SearchMatch> {
        self.query.pop();
        self.search(text)
    }

    fn search(&self, text: &str) -> Option<SearchMatch> {
        find_next(text, &self.query, self.options, self.origin)
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LITERAL: SearchOptions = SearchOptions {
        ignore_case: false,
        is_regex: false,
    };

    #[test]
    fn literal_forward_and_backward() {
        let text = "one two one two";
        let m = find_next(text, "two", LITERAL, 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (4, 7));

        let m = find_next(text, "two", LITERAL, 5).unwrap().unwrap();
        assert_eq!((m.start, m.end), (12, 15));

        let m = find_prev(text, "two", LITERAL, 12).unwrap().unwrap();
        assert_eq!((m.start, m.end), (4, 7));
    }

    #[test]
    fn ignore_case_matches_all_casings() {
        let options = SearchOptions {
            ignore_case: true,
            is_regex: false,
        };
        let matches = find_all("Foo bar foo FOO", "foo", options).unwrap();
        let starts: Vec<usize> = matches.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 8, 12]);
    }

    #[test]
    fn invalid_regex_is_a_pattern_error() {
        let options = SearchOptions {
            ignore_case: false,
            is_regex: true,
        };
        assert!(find_next("text", "(unclosed", options, 0).is_err());
        // A literal search for the same string is fine.
        assert!(find_next("text (unclosed", "(unclosed", LITERAL, 0)
            .unwrap()
            .is_some());
    }

    #[test]
    fn offsets_are_character_offsets() {
        let text = "日本語 abc";
        let m = find_next(text, "abc", LITERAL, 0).unwrap().unwrap();
        assert_eq!((m.start, m.end), (4, 7));
    }

    #[test]
    fn regex_replacement_expands_groups() {
        let options = SearchOptions {
            ignore_case: false,
            is_regex: true,
        };
        let text = "key=value";
        let m = find_next(text, r"(\w+)=(\w+)", options, 0).unwrap().unwrap();
        let replaced = replacement_for(text, r"(\w+)=(\w+)", options, m, "$2=$1").unwrap();
        assert_eq!(replaced, "value=key");
    }

    #[test]
    fn fast_find_grows_and_shrinks_by_codepoint() {
        let text = "abc aßc";
        let mut ff = FastFind::new(0, LITERAL);

        assert_eq!(ff.push_char('a', text).map(|m| m.start), Some(0));
        assert_eq!(ff.push_char('ß', text).map(|m| m.start), Some(4));
        assert_eq!(ff.query(), "aß");

        // Backspace removes the whole codepoint, not one byte.
        assert_eq!(ff.pop_char(text).map(|m| m.start), Some(0));
        assert_eq!(ff.query(), "a");
    }
}
