//! Structured edit records.
//!
//! Every buffer mutation produces one [`Edit`]. Incremental consumers use them without diffing
//! old/new text: the highlighter to find the lines whose lexical state may have changed, and the
//! diagnostics remapper to carry lint results computed against an older version forward.

use crate::buffer::Position;
use crate::diagnostics::{DiagnosticSet, RemapSummary};
use std::collections::VecDeque;

/// A single buffer change, expressed in positions of the pre-edit and post-edit buffers.
///
/// Semantics:
/// - `start..old_end` is the replaced range in the buffer at `version_before`.
/// - `start..new_end` is the range covered by `inserted_text` at `version_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Buffer version the edit was applied to.
    pub version_before: u64,
    /// Buffer version produced by the edit.
    pub version_after: u64,
    /// Start of the replaced range (same in both versions).
    pub start: Position,
    /// End of the replaced range in the old buffer.
    pub old_end: Position,
    /// End of the inserted text in the new buffer.
    pub new_end: Position,
    /// Length (in chars) of line `start.line` before the edit.
    pub start_line_len: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl Edit {
    /// Number of lines added (positive) or removed (negative) by the edit.
    pub fn line_delta(&self) -> isize {
        self.new_end.line as isize - self.old_end.line as isize
    }

    /// Lines touched in the old buffer.
    pub fn old_lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start.line..=self.old_end.line
    }

    /// Lines covered by the inserted text in the new buffer.
    pub fn new_lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start.line..=self.new_end.line
    }

    /// `true` if nothing was deleted.
    pub fn is_insertion(&self) -> bool {
        self.deleted_text.is_empty()
    }

    /// Map a position of the old buffer to the new buffer.
    ///
    /// Positions before the edit are unchanged, positions at or after the end of the replaced
    /// range move with the text that follows it, and positions inside the replaced range collapse
    /// to `start`.
    pub fn map_position(&self, position: Position) -> Position {
        if position < self.start {
            position
        } else if position >= self.old_end {
            if position.line == self.old_end.line {
                Position::new(
                    self.new_end.line,
                    position.column - self.old_end.column + self.new_end.column,
                )
            } else {
                Position::new(shift_line(position.line, self.line_delta()), position.column)
            }
        } else {
            self.start
        }
    }
}

pub(crate) fn shift_line(line: usize, delta: isize) -> usize {
    line.checked_add_signed(delta).unwrap_or(0)
}

/// Ordered history of recent edits, used to bring results computed against an older version
/// up to date.
#[derive(Debug, Clone, Default)]
pub struct EditLog {
    edits: VecDeque<Edit>,
}

impl EditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit. Edits must be pushed in version order.
    pub fn push(&mut self, edit: Edit) {
        debug_assert!(
            self.edits
                .back()
                .is_none_or(|last| last.version_after == edit.version_before),
            "edits must be contiguous"
        );
        self.edits.push_back(edit);
    }

    /// Edits applied on top of `version`, oldest first.
    ///
    /// Returns `None` if the log no longer reaches back to `version`.
    pub fn since(&self, version: u64) -> Option<impl Iterator<Item = &Edit>> {
        if self
            .edits
            .front()
            .is_some_and(|first| first.version_before > version)
        {
            return None;
        }
        Some(
            self.edits
                .iter()
                .skip_while(move |edit| edit.version_before < version),
        )
    }

    /// Bring `set` up to `current_version` by replaying every edit newer than the set.
    pub fn remap(&self, set: &mut DiagnosticSet, current_version: u64) -> RemapSummary {
        set.catch_up(self, current_version)
    }

    /// Drop edits that were applied before `version`.
    pub fn prune_before(&mut self, version: u64) {
        while self
            .edits
            .front()
            .is_some_and(|edit| edit.version_before < version)
        {
            self.edits.pop_front();
        }
    }

    /// Forget all edits.
    pub fn clear(&mut self) {
        self.edits.clear();
    }

    /// Number of retained edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns `true` if no edits are retained.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
