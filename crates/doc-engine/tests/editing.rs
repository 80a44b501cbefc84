use doc_engine::{DocEvent, Document, LineFlag, Selection};

/// Every offset must map to a line whose span contains it, after any edit
/// sequence.
fn assert_line_index_consistent(doc: &Document) {
    for offset in 0..=doc.len() {
        let line = doc.offset_to_line(offset);
        assert!(doc.line_to_offset(line) <= offset);
        if line + 1 < doc.line_count() {
            assert!(offset < doc.line_to_offset(line + 1));
        }
    }
}

#[test]
fn test_offset_to_line_stays_consistent_under_edits() {
    let mut doc = Document::new("alpha\nbeta\ngamma");
    assert_line_index_consistent(&doc);

    // Split a line.
    doc.set_selection(Selection::caret(8));
    doc.type_char('\n');
    assert_eq!(doc.line_count(), 4);
    assert_line_index_consistent(&doc);

    // Join lines back.
    doc.delete_backward();
    assert_eq!(doc.line_count(), 3);
    assert_line_index_consistent(&doc);

    // Kill a whole line.
    doc.set_selection(Selection::stream(6, 11));
    doc.start_action("cut");
    doc.delete_selection();
    doc.finish_action();
    assert_eq!(doc.text(), "alpha\ngamma");
    assert_line_index_consistent(&doc);

    // Paste multi-line text.
    doc.set_selection(Selection::caret(doc.len()));
    doc.paste("\none\ntwo");
    assert_eq!(doc.line_count(), 4);
    assert_line_index_consistent(&doc);
}

#[test]
fn test_multibyte_text_edits_do_not_split_characters() {
    let mut doc = Document::new("日本語\ntext");
    doc.set_selection(Selection::caret(1));
    doc.type_char('X');
    assert_eq!(doc.text(), "日X本語\ntext");

    doc.delete_backward();
    assert_eq!(doc.text(), "日本語\ntext");

    doc.set_selection(Selection::caret(0));
    doc.delete_forward();
    assert_eq!(doc.text(), "本語\ntext");
    assert_line_index_consistent(&doc);
}

#[test]
fn test_crlf_input_is_normalized_and_remembered() {
    let doc = Document::new("one\r\ntwo\r\n");
    assert_eq!(doc.text(), "one\ntwo\n");
    assert_eq!(doc.line_count(), 3);
    assert_eq!(
        doc.line_ending().apply_to_text(&doc.text()),
        "one\r\ntwo\r\n"
    );
}

#[test]
fn test_selection_change_dirties_old_and_new_lines() {
    let mut doc = Document::new("a\nb\nc\nd");
    doc.set_selection(Selection::caret(0));
    doc.clear_dirty_lines();
    doc.take_events();

    doc.set_selection(Selection::caret(6));
    let events = doc.take_events();
    assert!(events.contains(&DocEvent::SelectionChanged));
    assert!(doc.is_line_dirty(0));
    assert!(doc.is_line_dirty(3));
    assert!(!doc.is_line_dirty(1));
}

#[test]
fn test_markers_follow_their_lines_through_edits() {
    let mut doc = Document::new("one\ntwo\nthree");
    doc.set_line_marked(2, true);

    doc.set_selection(Selection::caret(0));
    doc.type_char('\n');
    assert!(doc.is_line_marked(3));
    assert!(!doc.is_line_marked(2));
}

#[test]
fn test_breakpoints_and_diff_markers_follow_their_lines() {
    let mut doc = Document::new("one\ntwo\nthree");
    doc.set_line_flag(1, LineFlag::Breakpoint, true);
    doc.set_line_flag(2, LineFlag::DiffMarker, true);

    doc.set_selection(Selection::caret(0));
    doc.type_char('\n');
    assert!(doc.has_line_flag(2, LineFlag::Breakpoint));
    assert!(!doc.has_line_flag(1, LineFlag::Breakpoint));
    assert!(doc.has_line_flag(3, LineFlag::DiffMarker));

    // Flags are independent of each other and of the bookmark marker.
    assert!(!doc.has_line_flag(2, LineFlag::DiffMarker));
    assert!(!doc.is_line_marked(2));
}

#[test]
fn test_drag_moves_text_in_one_undo_step() {
    let mut doc = Document::new("one two three");
    doc.set_selection(Selection::stream(0, 4));

    // Move "one " after "three" (target in original coordinates).
    doc.drop_text(13, false);
    assert_eq!(doc.text(), "two threeone ");
    assert_eq!(doc.selection(), Selection::stream(9, 13));

    assert!(doc.undo());
    assert_eq!(doc.text(), "one two three");

    // A copy drop leaves the source in place.
    let mut doc = Document::new("ab");
    doc.set_selection(Selection::stream(0, 1));
    doc.drop_text(2, true);
    assert_eq!(doc.text(), "aba");

    // Dropping a move onto its own selection is a no-op.
    let mut doc = Document::new("abcd");
    doc.set_selection(Selection::stream(1, 3));
    doc.drop_text(2, false);
    assert_eq!(doc.text(), "abcd");
}

#[test]
fn test_line_hashes_detect_changed_lines() {
    let mut doc = Document::new("same\ndiff\nsame");
    let before = doc.hash_line(1);
    assert_eq!(doc.hash_line(0), doc.hash_line(2));

    doc.set_selection(Selection::caret(5));
    doc.type_char('x');
    assert_ne!(doc.hash_line(1), before);
    assert_eq!(doc.hash_line(0), doc.hash_line(2));
}
