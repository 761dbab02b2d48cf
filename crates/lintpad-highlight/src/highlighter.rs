//! Incremental per-buffer highlighter.

use crate::grammar::Grammar;
use crate::tokenizer::LineState;
use lintpad_core::{Buffer, BufferError, Edit, TokenSpan};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineEntry {
    start: LineState,
    end: LineState,
    spans: Vec<TokenSpan>,
}

/// Token cache for one buffer.
///
/// Each line stores the state it starts in, the state it ends in and its spans. After an edit
/// only the edited lines are rescanned; rescanning then continues forward while the state
/// flowing into the next line differs from the state that line was cached with.
#[derive(Debug, Clone)]
pub struct Highlighter {
    grammar: Grammar,
    lines: Vec<LineEntry>,
}

impl Highlighter {
    /// Create an empty highlighter. Call [`Highlighter::rebuild`] before querying.
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            lines: Vec::new(),
        }
    }

    /// The grammar in use.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Number of cached lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Tokenize the whole buffer from scratch.
    pub fn rebuild(&mut self, buffer: &Buffer) -> Result<(), BufferError> {
        let count = buffer.line_count();
        let mut lines = Vec::with_capacity(count);
        let mut state = LineState::Normal;
        for line in 0..count {
            let text = buffer.line_text(line)?;
            let (spans, end) = self.grammar.tokenize_line(line, &text, &state);
            lines.push(LineEntry {
                start: std::mem::replace(&mut state, end.clone()),
                end,
                spans,
            });
        }
        self.lines = lines;
        tracing::debug!(lines = count, grammar = self.grammar.name(), "highlighter rebuilt");
        Ok(())
    }

    /// Update the cache after `edit` was applied to `buffer`.
    ///
    /// Returns the indices (in the new buffer) of every line whose spans were recomputed.
    pub fn retokenize_affected(
        &mut self,
        buffer: &Buffer,
        edit: &Edit,
    ) -> Result<BTreeSet<usize>, BufferError> {
        let expected = self
            .lines
            .len()
            .checked_add_signed(edit.line_delta())
            .unwrap_or(0);
        if self.lines.is_empty() || expected != buffer.line_count() {
            tracing::debug!(
                cached = self.lines.len(),
                lines = buffer.line_count(),
                "highlighter cache out of sync; rebuilding"
            );
            self.rebuild(buffer)?;
            return Ok((0..self.lines.len()).collect());
        }

        let first = edit.start.line;
        let delta = edit.line_delta();
        let placeholders = (first..=edit.new_end.line).map(|_| LineEntry {
            start: LineState::Normal,
            end: LineState::Normal,
            spans: Vec::new(),
        });
        self.lines.splice(first..=edit.old_end.line, placeholders);
        if delta != 0 {
            for (index, entry) in self.lines.iter_mut().enumerate().skip(edit.new_end.line + 1) {
                for span in &mut entry.spans {
                    span.line = index;
                }
            }
        }

        let mut changed = BTreeSet::new();
        let mut state = match first {
            0 => LineState::Normal,
            _ => self.lines[first - 1].end.clone(),
        };
        let mut line = first;
        while line < self.lines.len() {
            if line > edit.new_end.line && self.lines[line].start == state {
                break;
            }
            let text = buffer.line_text(line)?;
            let (spans, end) = self.grammar.tokenize_line(line, &text, &state);
            self.lines[line] = LineEntry {
                start: std::mem::replace(&mut state, end.clone()),
                end,
                spans,
            };
            changed.insert(line);
            line += 1;
        }

        tracing::debug!(
            version = edit.version_after,
            rescanned = changed.len(),
            "highlighter updated"
        );
        Ok(changed)
    }

    /// Spans of `line` (empty for unknown lines).
    pub fn spans(&self, line: usize) -> &[TokenSpan] {
        self.lines.get(line).map_or(&[], |entry| &entry.spans)
    }

    /// State at the end of `line`.
    pub fn line_state(&self, line: usize) -> Option<&LineState> {
        self.lines.get(line).map(|entry| &entry.end)
    }

    /// State `line` starts in.
    pub fn start_state(&self, line: usize) -> Option<&LineState> {
        self.lines.get(line).map(|entry| &entry.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintpad_core::{Position, Range, TokenCategory};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_line_edit_rescans_one_line() {
        let mut buffer = Buffer::from_text("a = 1\nb = 2\nc = 3");
        let mut highlighter = Highlighter::new(Grammar::python().unwrap());
        highlighter.rebuild(&buffer).unwrap();

        let edit = buffer.insert(Position::new(1, 4), "4").unwrap();
        let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(highlighter.spans(1).last().map(|s| s.end), Some(6));
    }

    #[test]
    fn test_line_indices_follow_inserted_lines() {
        let mut buffer = Buffer::from_text("a = 1\nb = 2\nc = 3");
        let mut highlighter = Highlighter::new(Grammar::python().unwrap());
        highlighter.rebuild(&buffer).unwrap();

        let edit = buffer.insert(Position::new(0, 5), "\nx = 0").unwrap();
        let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(highlighter.line_count(), 4);
        assert!(highlighter.spans(3).iter().all(|s| s.line == 3));
        assert_eq!(highlighter.spans(3)[0].category, TokenCategory::Identifier);

        let edit = buffer
            .delete(Range::new(Position::new(0, 5), Position::new(2, 5)))
            .unwrap();
        let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec![0]);
        assert!(highlighter.spans(1).iter().all(|s| s.line == 1));
    }
}
