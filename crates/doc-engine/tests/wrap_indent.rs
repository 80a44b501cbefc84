use doc_engine::{Document, Selection};

fn wrapped(text: &str, width: usize) -> Document {
    let mut doc = Document::new(text);
    doc.set_wrap_width(Some(width));
    doc.set_soft_wrap(true);
    doc
}

fn visual_lines(doc: &Document) -> Vec<String> {
    (0..doc.line_count()).map(|l| doc.line_text(l)).collect()
}

#[test]
fn test_soft_wrap_prefers_word_boundaries() {
    let doc = wrapped("the quick brown fox", 10);
    // "the quick " fits in 10 cells; the break lands after the space, never
    // inside "quick".
    assert_eq!(visual_lines(&doc), vec!["the quick ", "brown fox"]);
}

#[test]
fn test_soft_wrap_narrower_than_a_word_still_terminates() {
    let doc = wrapped("unbreakable", 3);
    assert_eq!(visual_lines(&doc), vec!["unb", "rea", "kab", "le"]);
}

#[test]
fn test_soft_wrap_does_not_change_stored_text() {
    let doc = wrapped("alpha beta gamma delta", 8);
    assert!(doc.line_count() > 1);
    assert_eq!(doc.text(), "alpha beta gamma delta");
}

#[test]
fn test_degenerate_widths_disable_wrapping() {
    let doc = wrapped("a long enough line of text", 0);
    assert_eq!(doc.line_count(), 1);

    let mut doc = Document::new("a long enough line of text");
    doc.set_wrap_width(Some(10));
    doc.set_soft_wrap(true);
    assert!(doc.line_count() > 1);
    doc.set_tab_width(0);
    assert_eq!(doc.line_count(), 1);
}

#[test]
fn test_wrap_recomputes_after_edits() {
    let mut doc = wrapped("aaaa", 6);
    assert_eq!(doc.line_count(), 1);

    doc.set_selection(Selection::caret(4));
    for ch in "bbbb".chars() {
        doc.type_char(ch);
    }
    assert_eq!(doc.text(), "aaaabbbb");
    assert_eq!(doc.line_count(), 2);

    assert!(doc.undo());
    assert_eq!(doc.line_count(), 1);
}

#[test]
fn test_continuations_carry_the_paragraph_indent() {
    let doc = wrapped("    lead follow tail end", 12);
    let lines = visual_lines(&doc);
    assert_eq!(lines[0], "    lead ");
    // Continuation budget shrinks by the 4-cell indent: 8 usable cells.
    assert!(lines[1..].iter().all(|l| l.chars().count() <= 8));
}

#[test]
fn test_offset_to_line_is_exact_across_soft_breaks() {
    let doc = wrapped("aaa bbb ccc ddd", 4);
    for offset in 0..=doc.len() {
        let line = doc.offset_to_line(offset);
        assert!(doc.line_to_offset(line) <= offset);
        if line + 1 < doc.line_count() {
            assert!(offset < doc.line_to_offset(line + 1));
        }
    }
}

#[test]
fn test_toggling_soft_wrap_restores_hard_lines() {
    let mut doc = wrapped("one two three four five six", 8);
    let wrapped_count = doc.line_count();
    assert!(wrapped_count > 1);

    doc.set_soft_wrap(false);
    assert_eq!(doc.line_count(), 1);

    doc.set_soft_wrap(true);
    assert_eq!(doc.line_count(), wrapped_count);
}
