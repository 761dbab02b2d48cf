use lintpad_core::{
    Buffer, Diagnostic, DiagnosticSet, EditLog, Position, Range, RemapOutcome, Severity,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn suffix(text: &str, column: usize) -> String {
    text.chars().skip(column).collect()
}

fn arb_case() -> impl Strategy<Value = (Vec<String>, usize, usize, usize, usize, String)> {
    prop::collection::vec("[a-c ]{0,5}", 1..6).prop_flat_map(|lines| {
        let count = lines.len();
        (
            Just(lines),
            0..count,
            0usize..6,
            0usize..1000,
            0usize..10,
            "[xy\n]{0,3}",
        )
    })
}

proptest! {
    /// A diagnostic that is kept or shifted still points at the text it was computed against;
    /// lines outside the edit never go stale.
    #[test]
    fn prop_remap_preserves_anchor_text((lines, line, col, at, len, inserted) in arb_case()) {
        let mut buffer = Buffer::from_text(&lines.join("\n"));
        let column = col.min(lines[line].chars().count());
        let mut diagnostic = Diagnostic::new(Severity::Warning, line, "d").with_column(column);

        let total = buffer.len_chars();
        let start = at % (total + 1);
        let end = (start + len).min(total);
        let range = Range::new(
            buffer.char_offset_to_position(start).unwrap(),
            buffer.char_offset_to_position(end).unwrap(),
        );
        let edit = buffer.replace(range, &inserted).unwrap();
        let outcome = diagnostic.remap_through(&edit);

        if line < edit.start.line {
            prop_assert_eq!(outcome, RemapOutcome::Kept);
        }
        if line > edit.old_end.line {
            prop_assert!(matches!(outcome, RemapOutcome::Kept | RemapOutcome::Shifted));
            prop_assert_eq!(diagnostic.line as isize, line as isize + edit.line_delta());
        }
        if matches!(outcome, RemapOutcome::Kept | RemapOutcome::Shifted) {
            prop_assert!(!diagnostic.stale);
            let new_line = buffer.line_text(diagnostic.line).unwrap();
            let new_column = diagnostic.column.unwrap();
            prop_assert_eq!(suffix(&new_line, new_column), suffix(&lines[line], column));
        }
        if outcome != RemapOutcome::Dropped {
            prop_assert!(diagnostic.line < buffer.line_count());
        }
    }
}

#[test]
fn test_delete_line_moves_later_diagnostic_up() {
    let mut buffer = Buffer::from_text("import os\nimport sys\nx = 1\n");
    let mut set = DiagnosticSet::new(
        buffer.version(),
        vec![
            Diagnostic::new(Severity::Warning, 1, "unused import sys")
                .with_column(0)
                .with_code("W0611"),
        ],
    );

    let edit = buffer
        .delete(Range::new(Position::new(0, 0), Position::new(1, 0)))
        .unwrap();
    let summary = set.remap_through(&edit);

    assert_eq!(summary.shifted, 1);
    assert_eq!(set.version(), buffer.version());
    assert_eq!(set.items()[0].line, 0);
    assert!(!set.items()[0].stale);
    assert_eq!(buffer.line_text(0).unwrap(), "import sys");
}

#[test]
fn test_log_remaps_result_computed_against_older_version() {
    let mut buffer = Buffer::from_text("a = 1\nb = 2\nc = 3\n");
    let requested_at = buffer.version();
    let mut log = EditLog::new();

    log.push(buffer.insert(Position::new(0, 0), "# header\n").unwrap());
    log.push(buffer.insert(Position::new(2, 5), "0").unwrap());

    let mut set = DiagnosticSet::new(
        requested_at,
        vec![
            Diagnostic::new(Severity::Error, 0, "a").with_column(0),
            Diagnostic::new(Severity::Error, 1, "b").with_column(4),
            Diagnostic::new(Severity::Error, 2, "c").with_column(0),
        ],
    );
    let summary = log.remap(&mut set, buffer.version());

    let placed: Vec<(usize, bool)> = set.items().iter().map(|d| (d.line, d.stale)).collect();
    assert_eq!(placed, vec![(1, false), (2, true), (3, false)]);
    assert_eq!(summary.stale, 1);
    assert_eq!(set.version(), buffer.version());
}
