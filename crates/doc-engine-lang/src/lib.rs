#![warn(missing_docs)]
//! `doc-engine-lang` - language plugin contract for `doc-engine`.
//!
//! The editing engine never assumes a specific programming language. Everything
//! language-aware (per-line styling state, bracket balancing, comment tokens,
//! keyword completion, smart-indent predicates) is supplied through the
//! [`Language`] trait defined here.
//!
//! This crate intentionally stays lightweight and does **not** depend on any
//! parsing or highlighting system. Besides the trait it ships two concrete
//! implementations: [`PlainText`] (the engine default, everything disabled) and
//! [`BraceLanguage`], a data-driven implementation for brace-structured
//! languages that is good enough for hosts without a real syntax backend.

use std::ops::Range;

/// Identifier for a style class within a [`StyleRun`].
pub type StyleId = u8;

/// Unstyled text.
pub const STYLE_PLAIN: StyleId = 0;
/// Comment text (line or block).
pub const STYLE_COMMENT: StyleId = 1;
/// String or character literal.
pub const STYLE_STRING: StyleId = 2;
/// Language keyword.
pub const STYLE_KEYWORD: StyleId = 3;
/// Numeric literal.
pub const STYLE_NUMBER: StyleId = 4;

/// A run of consecutively styled characters within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    /// Run length in characters.
    pub len: usize,
    /// Style class of the run.
    pub style: StyleId,
}

impl StyleRun {
    /// Create a new style run.
    pub fn new(len: usize, style: StyleId) -> Self {
        Self { len, style }
    }
}

/// Comment tokens for a given language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
}

impl CommentConfig {
    /// Create a config that supports only line comments.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            block_start: None,
            block_end: None,
        }
    }

    /// Create a config that supports both line and block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
        }
    }

    /// Returns `true` if a line comment token is configured.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if both block comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// A named symbol range, produced by [`Language::named_ranges`].
///
/// Offsets are character offsets into the document text. Hosts use the tree
/// for "jump to symbol" style features; the engine treats it as opaque data
/// rebuilt lazily after edits settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    /// Symbol name (e.g. function name).
    pub name: String,
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
    /// Nested symbols.
    pub children: Vec<NamedRange>,
}

/// The language plugin contract consumed by the editing engine.
///
/// `state` values are opaque `u16` lexer states threaded from line to line by
/// the engine's line index; `0` is always a valid "top level" state.
pub trait Language {
    /// Human-readable language name.
    fn name(&self) -> &str;

    /// Lexer state at the very start of a document.
    fn initial_state(&self, _filename: &str) -> u16 {
        0
    }

    /// Style one logical line given the lexer state at its start.
    ///
    /// Returns the style runs covering `text` (runs must sum to the character
    /// length of `text`) and the lexer state at the start of the next line.
    fn style_line(&self, text: &str, state: u16) -> (Vec<StyleRun>, u16);

    /// Find the opening partner for the balance character at `close_offset`.
    ///
    /// `text` is the whole document, `window` limits the backward probe (both
    /// in character offsets). Returns the opener's character offset, or `None`
    /// when unbalanced within the window.
    fn balance(&self, text: &str, window: Range<usize>, close_offset: usize) -> Option<usize>;

    /// Returns `true` if `ch` participates in bracket balancing.
    fn is_balance_char(&self, ch: char) -> bool;

    /// Returns `true` if smart indent may fire for the character at `column`
    /// of `line` (e.g. `false` inside strings and comments).
    fn is_smart_indent_location(&self, line: &str, column: usize) -> bool;

    /// Returns `true` if `ch` is a closing character that triggers smart indent.
    fn is_smart_indent_close_char(&self, ch: char) -> bool;

    /// Comment tokens for this language.
    fn comment_config(&self) -> &CommentConfig;

    /// Comment out one line, or `None` when the language has no line comments.
    fn comment_line(&self, line: &str) -> Option<String> {
        let token = self.comment_config().line.as_deref()?;
        if token.is_empty() {
            return None;
        }
        Some(format!("{token}{line}"))
    }

    /// Strip one level of line comment, or `None` when the line is not commented.
    fn uncomment_line(&self, line: &str) -> Option<String> {
        let token = self.comment_config().line.as_deref()?;
        if token.is_empty() {
            return None;
        }
        let trimmed_start = line.len() - line.trim_start().len();
        let rest = &line[trimmed_start..];
        let stripped = rest.strip_prefix(token)?;
        Some(format!("{}{}", &line[..trimmed_start], stripped))
    }

    /// Keywords beginning with `prefix`, in completion order.
    fn keywords_beginning_with(&self, prefix: &str) -> Vec<String>;

    /// Build the symbol outline for the document text.
    fn named_ranges(&self, _text: &str) -> Vec<NamedRange> {
        Vec::new()
    }

    /// File names referenced by include/import directives in `text`, in
    /// document order. Rebuilt lazily together with the symbol outline.
    fn include_files(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }

    /// Whether this language prefers soft-wrapped display (e.g. prose formats).
    fn softwrap(&self) -> bool {
        false
    }
}

/// The default language: no styling, no balancing, no keywords.
#[derive(Debug, Clone, Default)]
pub struct PlainText {
    comments: CommentConfig,
}

impl PlainText {
    /// Create a plain-text language.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Language for PlainText {
    fn name(&self) -> &str {
        "Plain Text"
    }

    fn style_line(&self, text: &str, state: u16) -> (Vec<StyleRun>, u16) {
        let len = text.chars().count();
        if len == 0 {
            (Vec::new(), state)
        } else {
            (vec![StyleRun::new(len, STYLE_PLAIN)], state)
        }
    }

    fn balance(&self, _text: &str, _window: Range<usize>, _close_offset: usize) -> Option<usize> {
        None
    }

    fn is_balance_char(&self, _ch: char) -> bool {
        false
    }

    fn is_smart_indent_location(&self, _line: &str, _column: usize) -> bool {
        false
    }

    fn is_smart_indent_close_char(&self, _ch: char) -> bool {
        false
    }

    fn comment_config(&self) -> &CommentConfig {
        &self.comments
    }

    fn keywords_beginning_with(&self, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Lexer state flag: the line starts inside a block comment.
const STATE_IN_BLOCK_COMMENT: u16 = 1;

/// A data-driven language for brace-structured syntaxes.
///
/// Configured with a keyword list, comment tokens, and an optional set of
/// definition keywords used to build the symbol outline. Styling recognizes
/// line/block comments, string and character literals, keywords, and numbers;
/// block comments may span lines (tracked through the lexer state).
#[derive(Debug, Clone)]
pub struct BraceLanguage {
    name: String,
    /// Sorted keyword list.
    keywords: Vec<String>,
    /// Keywords that introduce a named definition (`fn`, `struct`, ...).
    definition_keywords: Vec<String>,
    comments: CommentConfig,
    /// Directive token that names an included file (`#include`, `import`).
    include_directive: Option<String>,
    soft_wrap: bool,
}

impl BraceLanguage {
    /// Create a new brace language.
    pub fn new(
        name: impl Into<String>,
        mut keywords: Vec<String>,
        definition_keywords: Vec<String>,
        comments: CommentConfig,
    ) -> Self {
        keywords.sort();
        Self {
            name: name.into(),
            keywords,
            definition_keywords,
            comments,
            include_directive: None,
            soft_wrap: false,
        }
    }

    /// A small C-like configuration, handy for tests and demos.
    pub fn c_like() -> Self {
        let keywords = [
            "break", "case", "char", "const", "continue", "default", "do", "double", "else",
            "enum", "float", "for", "if", "int", "long", "return", "short", "static", "struct",
            "switch", "typedef", "union", "unsigned", "void", "while",
        ];
        Self::new(
            "C",
            keywords.iter().map(|s| s.to_string()).collect(),
            vec!["struct".to_string(), "enum".to_string(), "union".to_string()],
            CommentConfig::line_and_block("//", "/*", "*/"),
        )
        .with_include_directive("#include")
    }

    /// Set whether this language prefers soft wrapping.
    pub fn with_softwrap(mut self, soft_wrap: bool) -> Self {
        self.soft_wrap = soft_wrap;
        self
    }

    /// Set the directive token whose argument names an included file.
    pub fn with_include_directive(mut self, directive: impl Into<String>) -> Self {
        self.include_directive = Some(directive.into());
        self
    }

    fn is_ident_start(ch: char) -> bool {
        ch == '_' || ch.is_alphabetic()
    }

    fn is_ident_continue(ch: char) -> bool {
        ch == '_' || ch.is_alphanumeric()
    }
}

/// Push `len` characters of `style` onto `runs`, merging with the last run.
fn push_run(runs: &mut Vec<StyleRun>, len: usize, style: StyleId) {
    if len == 0 {
        return;
    }
    if let Some(last) = runs.last_mut()
        && last.style == style
    {
        last.len += len;
        return;
    }
    runs.push(StyleRun::new(len, style));
}

impl Language for BraceLanguage {
    fn name(&self) -> &str {
        &self.name
    }

    fn style_line(&self, text: &str, state: u16) -> (Vec<StyleRun>, u16) {
        let chars: Vec<char> = text.chars().collect();
        let mut runs: Vec<StyleRun> = Vec::new();
        let mut i = 0usize;
        let mut in_block = state & STATE_IN_BLOCK_COMMENT != 0;

        let line_token: Vec<char> = self
            .comments
            .line
            .as_deref()
            .unwrap_or("")
            .chars()
            .collect();
        let block_start: Vec<char> = self
            .comments
            .block_start
            .as_deref()
            .unwrap_or("")
            .chars()
            .collect();
        let block_end: Vec<char> = self
            .comments
            .block_end
            .as_deref()
            .unwrap_or("")
            .chars()
            .collect();

        let matches_at = |chars: &[char], i: usize, token: &[char]| -> bool {
            !token.is_empty() && chars[i..].starts_with(token)
        };

        while i < chars.len() {
            if in_block {
                // Consume until the block end token or end of line.
                let start = i;
                while i < chars.len() && !matches_at(&chars, i, &block_end) {
                    i += 1;
                }
                if i < chars.len() {
                    i += block_end.len();
                    in_block = false;
                }
                push_run(&mut runs, i - start, STYLE_COMMENT);
                continue;
            }

            let ch = chars[i];

            if matches_at(&chars, i, &line_token) {
                push_run(&mut runs, chars.len() - i, STYLE_COMMENT);
                i = chars.len();
                continue;
            }

            if matches_at(&chars, i, &block_start) {
                in_block = true;
                push_run(&mut runs, block_start.len(), STYLE_COMMENT);
                i += block_start.len();
                continue;
            }

            if ch == '"' || ch == '\'' {
                let quote = ch;
                let start = i;
                i += 1;
                while i < chars.len() {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 2;
                        continue;
                    }
                    if chars[i] == quote {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                push_run(&mut runs, i - start, STYLE_STRING);
                continue;
            }

            if Self::is_ident_start(ch) {
                let start = i;
                while i < chars.len() && Self::is_ident_continue(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let style = if self.keywords.binary_search(&word).is_ok() {
                    STYLE_KEYWORD
                } else {
                    STYLE_PLAIN
                };
                push_run(&mut runs, i - start, style);
                continue;
            }

            if ch.is_ascii_digit() {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                push_run(&mut runs, i - start, STYLE_NUMBER);
                continue;
            }

            push_run(&mut runs, 1, STYLE_PLAIN);
            i += 1;
        }

        let next_state = if in_block { STATE_IN_BLOCK_COMMENT } else { 0 };
        (runs, next_state)
    }

    fn balance(&self, text: &str, window: Range<usize>, close_offset: usize) -> Option<usize> {
        let chars: Vec<char> = text.chars().collect();
        let close = *chars.get(close_offset)?;
        let open = match close {
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => return None,
        };

        let floor = window.start.min(close_offset);
        let mut depth = 0usize;
        for i in (floor..close_offset).rev() {
            let ch = chars[i];
            if ch == close {
                depth += 1;
            } else if ch == open {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
        }
        None
    }

    fn is_balance_char(&self, ch: char) -> bool {
        matches!(ch, '(' | ')' | '[' | ']' | '{' | '}')
    }

    fn is_smart_indent_location(&self, line: &str, column: usize) -> bool {
        // Not inside a comment or string according to a top-level restyle of
        // this line alone. Approximate but cheap.
        let (runs, _) = self.style_line(line, 0);
        let mut consumed = 0usize;
        for run in runs {
            if column < consumed + run.len {
                return run.style != STYLE_COMMENT && run.style != STYLE_STRING;
            }
            consumed += run.len;
        }
        true
    }

    fn is_smart_indent_close_char(&self, ch: char) -> bool {
        ch == '}'
    }

    fn comment_config(&self) -> &CommentConfig {
        &self.comments
    }

    fn keywords_beginning_with(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() {
            return self.keywords.clone();
        }
        let start = self.keywords.partition_point(|k| k.as_str() < prefix);
        self.keywords[start..]
            .iter()
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn named_ranges(&self, text: &str) -> Vec<NamedRange> {
        let chars: Vec<char> = text.chars().collect();
        let mut out: Vec<NamedRange> = Vec::new();
        // Stack of open definitions: (name, start offset, children).
        let mut open: Vec<(String, usize, Vec<NamedRange>)> = Vec::new();
        let mut brace_depth: Vec<usize> = Vec::new();
        let mut depth = 0usize;

        let mut line_start = 0usize;
        let mut i = 0usize;
        while i <= chars.len() {
            let at_eol = i == chars.len() || chars[i] == '\n';
            if at_eol {
                let line: String = chars[line_start..i].iter().collect();
                let mut tokens = line.split_whitespace();
                if let Some(first) = tokens.next()
                    && self.definition_keywords.iter().any(|k| k == first)
                    && let Some(name) = tokens.next()
                {
                    let name = name.trim_matches(|c: char| !Self::is_ident_continue(c));
                    if !name.is_empty() {
                        open.push((name.to_string(), line_start, Vec::new()));
                        brace_depth.push(depth);
                    }
                }
                for (j, ch) in chars[line_start..i].iter().enumerate() {
                    match ch {
                        '{' => depth += 1,
                        '}' => {
                            depth = depth.saturating_sub(1);
                            if brace_depth.last() == Some(&depth) {
                                brace_depth.pop();
                                let (name, start, children) =
                                    open.pop().expect("stacks stay in sync");
                                let range = NamedRange {
                                    name,
                                    start,
                                    end: line_start + j + 1,
                                    children,
                                };
                                match open.last_mut() {
                                    Some((_, _, parent)) => parent.push(range),
                                    None => out.push(range),
                                }
                            }
                        }
                        _ => {}
                    }
                }
                line_start = i + 1;
            }
            i += 1;
        }

        // Unterminated definitions extend to end of text.
        while let Some((name, start, children)) = open.pop() {
            brace_depth.pop();
            let range = NamedRange {
                name,
                start,
                end: chars.len(),
                children,
            };
            match open.last_mut() {
                Some((_, _, parent)) => parent.push(range),
                None => out.push(range),
            }
        }

        out
    }

    fn include_files(&self, text: &str) -> Vec<String> {
        let Some(directive) = self.include_directive.as_deref() else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for line in text.lines() {
            let Some(rest) = line.trim_start().strip_prefix(directive) else {
                continue;
            };
            let rest = rest.trim_start();
            let name = match rest.chars().next() {
                Some('"') => rest[1..].split('"').next(),
                Some('<') => rest[1..].split('>').next(),
                _ => rest.split_whitespace().next(),
            };
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                out.push(name.to_string());
            }
        }
        out
    }

    fn softwrap(&self) -> bool {
        self.soft_wrap
    }
}
