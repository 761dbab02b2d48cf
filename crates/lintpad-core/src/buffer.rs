//! Rope-backed text buffer with a versioned line/column coordinate system.
//!
//! The buffer is the ground truth every other component references. Coordinates are
//! [`Position`] values (0-based line, 0-based column counted in Unicode scalar values), and every
//! successful mutation bumps [`Buffer::version`] and returns the [`Edit`] it produced.

use crate::edit::Edit;
use ropey::Rope;
use thiserror::Error;
use unicode_width::UnicodeWidthChar;

/// Default tab width (in cells) used when measuring display columns.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Logical position in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// 0-based line index.
    pub line: usize,
    /// 0-based column, in characters.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Half-open range of positions (`start..end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Line terminator detected when the document was opened.
///
/// The buffer always stores `\n`; the detected ending is kept so the host can restore it when
/// persisting the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Detect the dominant line ending of `text`.
    pub fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count();
        if crlf > 0 && crlf * 2 >= lf {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    /// The terminator as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Errors returned by buffer operations.
///
/// These indicate a caller bug (a coordinate that does not exist in the current version);
/// positions are never clamped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// A position references a nonexistent line or column.
    #[error("position {line}:{column} is out of range (line count {line_count})")]
    OutOfRange {
        /// Requested line.
        line: usize,
        /// Requested column.
        column: usize,
        /// Number of lines in the buffer.
        line_count: usize,
    },
    /// A range whose end precedes its start.
    #[error("invalid range {start:?}..{end:?}")]
    InvalidRange {
        /// Range start.
        start: Position,
        /// Range end.
        end: Position,
    },
}

/// Immutable copy of the buffer contents at a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Version the text belongs to.
    pub version: u64,
    /// Full document text (`\n` terminated lines).
    pub text: String,
}

/// Versioned text buffer.
#[derive(Debug, Clone)]
pub struct Buffer {
    rope: Rope,
    version: u64,
    line_ending: LineEnding,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Create an empty buffer (one empty line, version 0).
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            version: 0,
            line_ending: LineEnding::Lf,
        }
    }

    /// Create a buffer from document text. `\r\n` is normalized to `\n`.
    pub fn from_text(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        let rope = if text.contains("\r\n") {
            Rope::from_str(&normalize_newlines(text))
        } else {
            Rope::from_str(text)
        };
        Self {
            rope,
            version: 0,
            line_ending,
        }
    }

    /// Current version. Strictly increases with every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Line ending detected on open.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Number of `\n`-delimited lines (an empty buffer has one line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total number of characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Text of line `line`, without its terminator.
    pub fn line_text(&self, line: usize) -> Result<String, BufferError> {
        self.check_line(line)?;
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Length of line `line` in characters, without its terminator.
    pub fn line_len(&self, line: usize) -> Result<usize, BufferError> {
        self.check_line(line)?;
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            Ok(len - 1)
        } else {
            Ok(len)
        }
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Copy of the current contents tagged with the current version.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            text: self.text(),
        }
    }

    /// Validate `position` against the current contents.
    pub fn check_position(&self, position: Position) -> Result<(), BufferError> {
        let len = self.line_len(position.line).map_err(|_| self.out_of_range(position))?;
        if position.column > len {
            return Err(self.out_of_range(position));
        }
        Ok(())
    }

    /// Convert a position to a character offset from the start of the document.
    pub fn position_to_char_offset(&self, position: Position) -> Result<usize, BufferError> {
        self.check_position(position)?;
        Ok(self.rope.line_to_char(position.line) + position.column)
    }

    /// Convert a character offset to a position.
    pub fn char_offset_to_position(&self, offset: usize) -> Result<Position, BufferError> {
        if offset > self.rope.len_chars() {
            return Err(BufferError::OutOfRange {
                line: self.line_count(),
                column: offset,
                line_count: self.line_count(),
            });
        }
        let line = self.rope.char_to_line(offset);
        let column = offset - self.rope.line_to_char(line);
        Ok(Position::new(line, column))
    }

    /// Convert a position to a UTF-8 byte offset from the start of the document.
    pub fn position_to_byte_offset(&self, position: Position) -> Result<usize, BufferError> {
        let offset = self.position_to_char_offset(position)?;
        Ok(self.rope.char_to_byte(offset))
    }

    /// Screen column of `position`, expanding tabs to `tab_width` and counting wide characters
    /// (CJK, emoji) as two cells.
    pub fn display_column(&self, position: Position, tab_width: usize) -> Result<usize, BufferError> {
        self.check_position(position)?;
        let line = self.rope.line(position.line);
        Ok(display_width(line.chars().take(position.column), tab_width))
    }

    /// Insert `text` at `position`.
    pub fn insert(&mut self, position: Position, text: &str) -> Result<Edit, BufferError> {
        self.replace(Range::new(position, position), text)
    }

    /// Delete the characters in `range`.
    pub fn delete(&mut self, range: Range) -> Result<Edit, BufferError> {
        self.replace(range, "")
    }

    /// Replace the characters in `range` with `text`.
    ///
    /// This is the single mutation primitive: the version is bumped exactly once and the
    /// returned [`Edit`] describes the change.
    pub fn replace(&mut self, range: Range, text: &str) -> Result<Edit, BufferError> {
        if range.end < range.start {
            return Err(BufferError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let start = self.position_to_char_offset(range.start)?;
        let end = self.position_to_char_offset(range.end)?;
        let start_line_len = self.line_len(range.start.line)?;

        let inserted = if text.contains("\r\n") {
            normalize_newlines(text)
        } else {
            text.to_string()
        };
        let deleted = self.rope.slice(start..end).to_string();

        if start < end {
            self.rope.remove(start..end);
        }
        if !inserted.is_empty() {
            self.rope.insert(start, &inserted);
        }

        let version_before = self.version;
        self.version += 1;

        Ok(Edit {
            version_before,
            version_after: self.version,
            start: range.start,
            old_end: range.end,
            new_end: end_position(range.start, &inserted),
            start_line_len,
            deleted_text: deleted,
            inserted_text: inserted,
        })
    }

    fn check_line(&self, line: usize) -> Result<(), BufferError> {
        if line >= self.line_count() {
            return Err(BufferError::OutOfRange {
                line,
                column: 0,
                line_count: self.line_count(),
            });
        }
        Ok(())
    }

    fn out_of_range(&self, position: Position) -> BufferError {
        BufferError::OutOfRange {
            line: position.line,
            column: position.column,
            line_count: self.line_count(),
        }
    }
}

/// Position reached after writing `text` starting at `start`.
pub fn end_position(start: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(start.line, start.column + text.chars().count()),
        Some(last) => Position::new(
            start.line + text.matches('\n').count(),
            text[last + 1..].chars().count(),
        ),
    }
}

/// Cell width of a run of characters, with tabs expanded to the next tab stop.
pub fn display_width(chars: impl IntoIterator<Item = char>, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    chars.into_iter().fold(0, |x, ch| match ch {
        '\t' => x + (tab_width - x % tab_width),
        '\n' => x,
        ch => x + ch.width().unwrap_or(0),
    })
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_matches_newlines() {
        assert_eq!(Buffer::new().line_count(), 1);
        assert_eq!(Buffer::from_text("a").line_count(), 1);
        assert_eq!(Buffer::from_text("a\n").line_count(), 2);
        assert_eq!(Buffer::from_text("a\nb\nc").line_count(), 3);
    }

    #[test]
    fn test_crlf_is_normalized() {
        let buffer = Buffer::from_text("a\r\nb\r\n");
        assert_eq!(buffer.line_ending(), LineEnding::CrLf);
        assert_eq!(buffer.text(), "a\nb\n");
        assert_eq!(buffer.line_text(1).unwrap(), "b");
    }

    #[test]
    fn test_insert_returns_edit_and_bumps_version() {
        let mut buffer = Buffer::from_text("def f():\n    pass");
        let edit = buffer.insert(Position::new(0, 4), "g").unwrap();
        assert_eq!(edit.version_before, 0);
        assert_eq!(edit.version_after, 1);
        assert_eq!(edit.new_end, Position::new(0, 5));
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.line_text(0).unwrap(), "def gf():");
    }

    #[test]
    fn test_multiline_replace_edit_positions() {
        let mut buffer = Buffer::from_text("one\ntwo\nthree");
        let edit = buffer
            .replace(
                Range::new(Position::new(0, 1), Position::new(1, 2)),
                "X\nY\nZ",
            )
            .unwrap();
        assert_eq!(edit.deleted_text, "ne\ntw");
        assert_eq!(edit.new_end, Position::new(2, 1));
        assert_eq!(edit.line_delta(), 1);
        assert_eq!(buffer.text(), "oX\nY\nZo\nthree");
    }

    #[test]
    fn test_out_of_range_is_not_clamped() {
        let mut buffer = Buffer::from_text("ab\ncd");
        assert_eq!(
            buffer.insert(Position::new(0, 3), "x"),
            Err(BufferError::OutOfRange {
                line: 0,
                column: 3,
                line_count: 2
            })
        );
        assert!(matches!(
            buffer.delete(Range::new(Position::new(1, 0), Position::new(5, 0))),
            Err(BufferError::OutOfRange { line: 5, .. })
        ));
        assert!(matches!(
            buffer.delete(Range::new(Position::new(1, 1), Position::new(0, 0))),
            Err(BufferError::InvalidRange { .. })
        ));
        assert_eq!(buffer.version(), 0);
        assert!(buffer.line_text(2).is_err());
    }

    #[test]
    fn test_offsets_and_display_columns() {
        let buffer = Buffer::from_text("a👋b\n\t中x");
        assert_eq!(buffer.position_to_char_offset(Position::new(1, 1)).unwrap(), 5);
        assert_eq!(buffer.char_offset_to_position(5).unwrap(), Position::new(1, 1));
        assert_eq!(buffer.position_to_byte_offset(Position::new(0, 2)).unwrap(), 5);
        assert_eq!(buffer.display_column(Position::new(0, 2), 4).unwrap(), 3);
        assert_eq!(buffer.display_column(Position::new(1, 2), 4).unwrap(), 6);
    }
}
