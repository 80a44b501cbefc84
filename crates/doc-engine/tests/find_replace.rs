use doc_engine::{Direction, Document, SearchOptions, Selection};

const IGNORE_CASE: SearchOptions = SearchOptions {
    ignore_case: true,
    is_regex: false,
};

const REGEX: SearchOptions = SearchOptions {
    ignore_case: false,
    is_regex: true,
};

#[test]
fn test_find_all_reports_offsets_and_lines() {
    let doc = Document::new("Foo bar foo FOO");
    let matches = doc.find_all("foo", IGNORE_CASE, false);
    let spans: Vec<(usize, usize, usize)> =
        matches.iter().map(|m| (m.line, m.start, m.end)).collect();
    assert_eq!(spans, vec![(0, 0, 3), (0, 8, 11), (0, 12, 15)]);
}

#[test]
fn test_find_all_is_line_aware_across_lines() {
    let doc = Document::new("foo\nbar foo\n\nfoo");
    let matches = doc.find_all("foo", SearchOptions::default(), false);
    let lines: Vec<usize> = matches.iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![0, 1, 3]);
    assert_eq!(matches[1].line_text, "bar foo");
}

#[test]
fn test_find_all_restricted_to_selection() {
    let mut doc = Document::new("hit hit hit");
    doc.set_selection(Selection::stream(4, 7));
    let matches = doc.find_all("hit", SearchOptions::default(), true);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start, 4);
}

#[test]
fn test_find_next_walks_forward_and_backward() {
    let mut doc = Document::new("ab ab ab");
    assert!(doc.find_first("ab", SearchOptions::default()));
    assert_eq!(doc.selection(), Selection::stream(0, 2));

    assert!(doc.find_next(Direction::Forward));
    assert_eq!(doc.selection(), Selection::stream(3, 5));
    assert!(doc.find_next(Direction::Forward));
    assert_eq!(doc.selection(), Selection::stream(6, 8));
    assert!(!doc.find_next(Direction::Forward));

    assert!(doc.find_next(Direction::Backward));
    assert_eq!(doc.selection(), Selection::stream(3, 5));
}

#[test]
fn test_malformed_regex_is_no_match_not_a_crash() {
    let mut doc = Document::new("some (unclosed text");
    assert!(!doc.find_first("(unclosed", REGEX));
    // The same string searched literally is fine.
    assert!(doc.find_first("(unclosed", SearchOptions::default()));
    assert_eq!(doc.selection(), Selection::stream(5, 14));
}

#[test]
fn test_regex_replace_expands_capture_groups() {
    let mut doc = Document::new("name: alpha\nname: beta");
    let count = doc.replace_all(r"name: (\w+)", "$1!", REGEX);
    assert_eq!(count, 2);
    assert_eq!(doc.text(), "alpha!\nbeta!");
}

#[test]
fn test_find_first_wraps_to_the_document_start() {
    let mut doc = Document::new("needle haystack");
    doc.set_selection(Selection::caret(10));
    assert!(doc.find_first("needle", SearchOptions::default()));
    assert_eq!(doc.selection(), Selection::stream(0, 6));

    // A pattern absent everywhere still reports no match after the wrap.
    doc.set_selection(Selection::caret(10));
    assert!(!doc.find_first("missing", SearchOptions::default()));
}

#[test]
fn test_replace_only_fires_on_a_matching_selection() {
    let mut doc = Document::new("cat dog");
    assert!(doc.find_first("cat", SearchOptions::default()));

    // Move the selection off the match; replace must refuse.
    doc.set_selection(Selection::stream(4, 7));
    assert!(!doc.replace("bird", false));
    assert_eq!(doc.text(), "cat dog");

    assert!(doc.find_first("cat", SearchOptions::default()));
    assert!(doc.replace("bird", false));
    assert_eq!(doc.text(), "bird dog");
}

#[test]
fn test_replace_all_handles_growing_replacements() {
    // Each replacement is longer than its match; offsets must be re-derived
    // as the text grows, and the inserted text must never be re-matched.
    let mut doc = Document::new("aa aa");
    let count = doc.replace_all("aa", "aaaa", SearchOptions::default());
    assert_eq!(count, 2);
    assert_eq!(doc.text(), "aaaa aaaa");
}

#[test]
fn test_replace_all_handles_shrinking_replacements() {
    let mut doc = Document::new("longword x longword");
    let count = doc.replace_all("longword", "l", SearchOptions::default());
    assert_eq!(count, 2);
    assert_eq!(doc.text(), "l x l");
}

#[test]
fn test_fast_find_backspace_removes_whole_codepoint() {
    let mut doc = Document::new("straße strasse");
    doc.fast_find_start(false);
    for ch in "straß".chars() {
        doc.fast_find_push(ch);
    }
    assert_eq!(doc.selection(), Selection::stream(0, 5));

    // One backspace removes 'ß' entirely; the query is now "stra" and the
    // first match from the origin is selected again.
    assert!(doc.fast_find_pop());
    assert_eq!(doc.selection(), Selection::stream(0, 4));
}

#[test]
fn test_fast_find_does_not_move_selection_on_miss() {
    let mut doc = Document::new("abc");
    doc.set_selection(Selection::caret(0));
    doc.fast_find_start(false);
    assert!(doc.fast_find_push('z') == false);
    assert_eq!(doc.selection(), Selection::caret(0));
}
