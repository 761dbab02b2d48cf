use lintpad_core::{Buffer, Position, Range, TokenCategory, spans_cover_line};
use lintpad_highlight::{Grammar, Highlighter, LineState};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn python() -> Grammar {
    Grammar::python().unwrap()
}

fn assert_matches_rebuild(highlighter: &Highlighter, buffer: &Buffer) {
    let mut fresh = Highlighter::new(highlighter.grammar().clone());
    fresh.rebuild(buffer).unwrap();
    assert_eq!(highlighter.line_count(), fresh.line_count());
    for line in 0..fresh.line_count() {
        assert_eq!(highlighter.spans(line), fresh.spans(line), "line {line}");
        assert_eq!(highlighter.line_state(line), fresh.line_state(line), "line {line}");
    }
}

#[test]
fn test_unterminated_triple_quote_runs_to_end_of_document() {
    let mut buffer = Buffer::from_text("x = 1\ny = 2\nz = 3\nw = 4");
    let mut highlighter = Highlighter::new(python());
    highlighter.rebuild(&buffer).unwrap();

    let edit = buffer.insert(Position::new(1, 4), "\"\"\"").unwrap();
    let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
    assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    for line in 2..4 {
        let spans = highlighter.spans(line);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, TokenCategory::String);
    }
    assert!(matches!(
        highlighter.line_state(3),
        Some(LineState::InRegion { .. })
    ));

    // Closing the string on line 2 stops the propagation there.
    let edit = buffer.insert(Position::new(2, 5), "\"\"\"").unwrap();
    let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
    assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(highlighter.spans(3)[0].category, TokenCategory::Identifier);
    assert_matches_rebuild(&highlighter, &buffer);

    // Editing inside the string does not touch the following lines.
    let edit = buffer.insert(Position::new(2, 0), "text ").unwrap();
    let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
    assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![2]);
    assert_matches_rebuild(&highlighter, &buffer);
}

#[test]
fn test_empty_lines_carry_region_state() {
    let mut buffer = Buffer::from_text("s = '''\n\nend'''");
    let mut highlighter = Highlighter::new(python());
    highlighter.rebuild(&buffer).unwrap();

    assert!(highlighter.spans(1).is_empty());
    assert_eq!(highlighter.line_state(1), highlighter.line_state(0));
    assert_eq!(highlighter.line_state(2), Some(&LineState::Normal));

    let edit = buffer
        .delete(Range::new(Position::new(0, 4), Position::new(0, 7)))
        .unwrap();
    highlighter.retokenize_affected(&buffer, &edit).unwrap();
    assert_matches_rebuild(&highlighter, &buffer);
}

fn arb_source_line() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "def", "x", " ", "\t", "'''", "\"\"\"", "'", "\"", "#", "1.5", "0x1f", "(", ")",
            ":", "==", ">>=", "\\", "é", "名", "self",
        ]),
        0..10,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_document() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_source_line(), 1..8).prop_map(|lines| lines.join("\n"))
}

fn arb_edit() -> impl Strategy<Value = (usize, usize, String)> {
    (
        0usize..1000,
        0usize..12,
        prop::collection::vec(
            prop::sample::select(vec!["'''", "\"", "\n", "x", "#", " ", "\\"]),
            0..4,
        )
        .prop_map(|parts| parts.concat()),
    )
}

proptest! {
    /// Spans are contiguous and cover every line exactly.
    #[test]
    fn prop_spans_cover_every_line(doc in arb_document()) {
        let buffer = Buffer::from_text(&doc);
        let mut highlighter = Highlighter::new(python());
        highlighter.rebuild(&buffer).unwrap();
        for line in 0..buffer.line_count() {
            let len = buffer.line_len(line).unwrap();
            prop_assert!(spans_cover_line(highlighter.spans(line), len));
            prop_assert!(highlighter.spans(line).iter().all(|s| s.line == line));
        }
    }

    /// Tokenizing the same line twice gives the same result.
    #[test]
    fn prop_tokenize_is_idempotent(line in arb_source_line()) {
        let grammar = python();
        prop_assert_eq!(grammar.tokenize(&line), grammar.tokenize(&line));
    }

    /// Incremental updates always agree with a full rebuild.
    #[test]
    fn prop_incremental_matches_rebuild(
        doc in arb_document(),
        edits in prop::collection::vec(arb_edit(), 1..8),
    ) {
        let mut buffer = Buffer::from_text(&doc);
        let mut highlighter = Highlighter::new(python());
        highlighter.rebuild(&buffer).unwrap();

        for (at, len, text) in edits {
            let total = buffer.len_chars();
            let start = at % (total + 1);
            let end = (start + len).min(total);
            let range = Range::new(
                buffer.char_offset_to_position(start).unwrap(),
                buffer.char_offset_to_position(end).unwrap(),
            );
            let edit = buffer.replace(range, &text).unwrap();
            highlighter.retokenize_affected(&buffer, &edit).unwrap();

            let mut fresh = Highlighter::new(python());
            fresh.rebuild(&buffer).unwrap();
            prop_assert_eq!(highlighter.line_count(), fresh.line_count());
            for line in 0..fresh.line_count() {
                prop_assert_eq!(highlighter.spans(line), fresh.spans(line));
                prop_assert_eq!(highlighter.line_state(line), fresh.line_state(line));
            }
        }
    }
}
