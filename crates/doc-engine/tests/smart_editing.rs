use std::ops::Range;

use doc_engine::lang::{BraceLanguage, CommentConfig, Language, StyleRun};
use doc_engine::{Direction, Document, Selection};

fn c_doc(text: &str) -> Document {
    Document::with_language(text, "test.c", Box::new(BraceLanguage::c_like()))
}

fn typed(doc: &mut Document, text: &str) {
    for ch in text.chars() {
        doc.type_char(ch);
    }
}

#[test]
fn test_auto_indent_carries_leading_whitespace() {
    let mut doc = Document::new("\tfirst");
    doc.set_selection(Selection::caret(6));
    typed(&mut doc, "\nsecond");
    assert_eq!(doc.text(), "\tfirst\n\tsecond");
}

#[test]
fn test_tab_enters_spaces_based_on_visual_column() {
    let mut doc = Document::new("\tx");
    doc.set_tab_inserts_spaces(true);
    // Caret after the tab sits at visual column 4: a full stop away.
    doc.set_selection(Selection::caret(1));
    doc.type_char('\t');
    assert_eq!(doc.text(), "\t    x");

    // At column 2 of "ab", only two spaces reach the next stop.
    let mut doc = Document::new("ab");
    doc.set_tab_inserts_spaces(true);
    doc.set_selection(Selection::caret(2));
    doc.type_char('\t');
    assert_eq!(doc.text(), "ab  ");
}

#[test]
fn test_smart_indent_aligns_closing_brace_with_opener() {
    let mut doc = c_doc("if (a) {\n\tbody;\n\t");
    doc.set_selection(Selection::caret(doc.len()));
    doc.type_char('}');
    // The closer's line held only whitespace, so it is re-indented to match
    // the opener's line (no indent).
    assert_eq!(doc.text(), "if (a) {\n\tbody;\n}");
}

#[test]
fn test_smart_indent_breaks_closer_onto_fresh_line() {
    let mut doc = c_doc("\tif (a) {\n\t\tbody;");
    doc.set_selection(Selection::caret(doc.len()));
    doc.type_char('}');
    assert_eq!(doc.text(), "\tif (a) {\n\t\tbody;\n\t}");
}

#[test]
fn test_smart_indent_single_undo_removes_brace_and_indent() {
    let mut doc = c_doc("if (a) {\n\tbody;\n\t");
    doc.set_selection(Selection::caret(doc.len()));
    doc.type_char('}');
    assert!(doc.undo());
    assert_eq!(doc.text(), "if (a) {\n\tbody;\n\t");
}

#[test]
fn test_balance_flash_restores_selection() {
    let mut doc = c_doc("f(arg");
    doc.set_selection(Selection::caret(5));
    doc.type_char(')');
    assert_eq!(doc.text(), "f(arg)");
    // The flash swapped to the opener and back; the caret ends after ')'.
    assert_eq!(doc.selection(), Selection::caret(6));
}

#[test]
fn test_entab_detab_idempotence_for_full_runs() {
    let original = "\t\tindented\n\tless\nnone";
    let mut doc = Document::new(original);
    doc.detab();
    assert_eq!(doc.text(), "        indented\n    less\nnone");
    doc.entab();
    assert_eq!(doc.text(), original);
}

#[test]
fn test_entab_detab_partial_runs_are_the_documented_exception() {
    // Two spaces at column 0 do not reach a tab stop; entab leaves them, so
    // detab(entab(x)) == x here but entab cannot shorten it.
    let mut doc = Document::new("  x");
    doc.entab();
    assert_eq!(doc.text(), "  x");

    // A run that does end on a stop becomes one tab, and detab expands it
    // back to the same columns, so this one round-trips.
    let mut doc = Document::new("a   b");
    doc.entab();
    assert_eq!(doc.text(), "a\tb");
    doc.detab();
    assert_eq!(doc.text(), "a   b");
}

#[test]
fn test_entab_over_block_selection_only_touches_columns() {
    let mut doc = Document::new("a    b    c\nd    e    f");
    // Columns 5..11 cover "b    c"; the run before 'b' stays, the two spaces
    // after each stop do too.
    doc.set_selection(Selection::block(0, 5, 1, 11));
    doc.entab();
    assert_eq!(doc.text(), "a    b\t  c\nd    e\t  f");
}

#[test]
fn test_comment_and_uncomment_selection() {
    let mut doc = c_doc("one();\ntwo();\nthree();");
    doc.set_selection(Selection::stream(7, 13));
    assert!(doc.comment_selection());
    assert_eq!(doc.text(), "one();\n//two();\nthree();");

    assert!(doc.uncomment_selection());
    assert_eq!(doc.text(), "one();\ntwo();\nthree();");
}

#[test]
fn test_comment_round_trips_through_one_undo_step() {
    let mut doc = c_doc("one();\ntwo();\nthree();");
    doc.set_selection(Selection::stream(0, 13));
    assert!(doc.comment_selection());
    assert_eq!(doc.text(), "//one();\n//two();\nthree();");

    assert!(doc.undo());
    assert_eq!(doc.text(), "one();\ntwo();\nthree();");
    assert!(!doc.undo());
}

/// A language whose styling always fails, standing in for a buggy plugin.
struct FaultyStyles {
    comments: CommentConfig,
}

impl Language for FaultyStyles {
    fn name(&self) -> &str {
        "faulty"
    }

    fn style_line(&self, _text: &str, _state: u16) -> (Vec<StyleRun>, u16) {
        panic!("styling fault");
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

#[test]
fn test_styling_panic_leaves_buffer_and_line_starts_intact() {
    let mut doc = Document::with_language(
        "one\ntwo\nthree",
        "x.txt",
        Box::new(FaultyStyles {
            comments: CommentConfig::default(),
        }),
    );
    assert_eq!(doc.line_count(), 3);
    assert_eq!(doc.line_to_offset(1), 4);
    assert_eq!(doc.line_to_offset(2), 8);

    doc.set_selection(Selection::caret(3));
    doc.type_char('!');
    assert_eq!(doc.text(), "one!\ntwo\nthree");
    assert_eq!(doc.line_to_offset(1), 5);

    // Styling degrades to a single plain run instead of propagating.
    let (text, runs) = doc.styled_text(1);
    assert_eq!(text, "two");
    assert_eq!(runs.len(), 1);
}

#[test]
fn test_completion_prefers_nearby_words_then_keywords() {
    let mut doc = c_doc("strange strong\nstr");
    doc.set_selection(Selection::caret(doc.len()));

    assert!(doc.complete_word(Direction::Forward, &[]));
    // Wrapping scan from the caret finds "strange" first.
    assert_eq!(doc.text(), "strange strong\nstrange");

    assert!(doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "strange strong\nstrong");

    // The keyword list contributes after buffer words.
    assert!(doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "strange strong\nstruct");

    // Cycling past the last candidate restores the typed fragment.
    assert!(doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "strange strong\nstr");
}

#[test]
fn test_completion_backward_cycles_in_reverse() {
    let mut doc = Document::new("alpha\nal");
    doc.set_selection(Selection::caret(doc.len()));
    assert!(doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "alpha\nalpha");

    // Backward from the first candidate wraps to the fragment.
    assert!(doc.complete_word(Direction::Backward, &[]));
    assert_eq!(doc.text(), "alpha\nal");
}

#[test]
fn test_completion_resets_when_context_changes() {
    let mut doc = Document::new("window\nwin");
    doc.set_selection(Selection::caret(doc.len()));
    assert!(doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "window\nwindow");

    // Typing interrupts the cycle; the next completion starts fresh from the
    // new fragment.
    doc.type_char('s');
    assert!(!doc.complete_word(Direction::Forward, &[]));
    assert_eq!(doc.text(), "window\nwindows");
}
