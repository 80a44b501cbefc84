use doc_engine::{Document, Selection};

#[test]
fn test_block_delete_removes_same_columns_on_every_line() {
    // Columns 2..5 from three lines, each cut independently.
    let mut doc = Document::new("abcdefg\n0123456\nzyxwvut");
    doc.set_selection(Selection::block(0, 2, 2, 5));
    doc.cut();
    assert_eq!(doc.text(), "abfg\n0156\nzyut");
}

#[test]
fn test_block_delete_skips_lines_shorter_than_the_rectangle() {
    let mut doc = Document::new("abcdefg\nab\nabcdefg");
    doc.set_selection(Selection::block(0, 3, 2, 6));
    doc.cut();
    assert_eq!(doc.text(), "abcg\nab\nabcg");
}

#[test]
fn test_block_copy_pads_short_lines_with_spaces() {
    let mut doc = Document::new("abcdefg\nab\nabcdefg");
    doc.set_selection(Selection::block(0, 3, 2, 6));
    assert_eq!(doc.copy_selection(), vec!["def", "   ", "def"]);
    // Copy alone must not change the text.
    assert_eq!(doc.text(), "abcdefg\nab\nabcdefg");
}

#[test]
fn test_block_paste_extends_short_lines() {
    let mut doc = Document::new("aaaa\nb\ncccc");
    doc.set_selection(Selection::block(0, 4, 2, 4));
    doc.paste("XX\nXX\nXX");
    assert_eq!(doc.text(), "aaaaXX\nb   XX\nccccXX");
}

#[test]
fn test_block_paste_appends_lines_past_the_end() {
    let mut doc = Document::new("only");
    doc.set_selection(Selection::block(0, 0, 0, 0));
    doc.paste("11\n22\n33");
    assert_eq!(doc.text(), "11only\n22\n33");
}

#[test]
fn test_block_edit_splits_tabs_at_column_boundaries() {
    // The tab after 'a' covers columns 1..4; deleting columns 2..3 must break
    // it into spaces on both flanks.
    let mut doc = Document::new("a\tb");
    doc.set_selection(Selection::block(0, 2, 0, 3));
    doc.cut();
    assert_eq!(doc.text(), "a  b");
}

#[test]
fn test_zero_width_block_is_empty() {
    let mut doc = Document::new("one\ntwo");
    doc.set_selection(Selection::block(0, 2, 1, 2));
    assert!(doc.selection().is_empty());

    // Cutting an empty block changes nothing.
    doc.cut();
    assert_eq!(doc.text(), "one\ntwo");
}

#[test]
fn test_select_lines_expands_to_whole_lines() {
    let mut doc = Document::new("first\nsecond\nthird");
    doc.set_selection(Selection::stream(8, 9));
    doc.select_lines();
    assert_eq!(doc.selection(), Selection::stream(6, 13));

    doc.set_selection(Selection::block(1, 1, 2, 2));
    doc.select_lines();
    assert_eq!(doc.selection(), Selection::stream(6, 18));
}

#[test]
fn test_block_corner_columns_are_visual_not_character() {
    // '你' is two cells wide: column 4 on line 0 is character offset 2.
    let mut doc = Document::new("你好x\nabcdx");
    doc.set_selection(Selection::block(0, 4, 1, 5));
    doc.cut();
    assert_eq!(doc.text(), "你好\nabcd");
}
