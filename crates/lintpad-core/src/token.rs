//! Lexical token spans produced by the highlighter.

use serde::{Deserialize, Serialize};

/// Closed set of lexical categories a token can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    /// Language keyword (`def`, `class`, `true`, ...).
    Keyword,
    /// Names, including builtins.
    Identifier,
    /// String literal (single or multi-line).
    String,
    /// Numeric literal.
    Number,
    /// Comment text.
    Comment,
    /// Operator (`+`, `==`, `>>=`, ...).
    Operator,
    /// Brackets, separators.
    Punctuation,
    /// Whitespace and anything no rule matched.
    Plain,
}

impl TokenCategory {
    /// Every category, in declaration order.
    pub const ALL: [TokenCategory; 8] = [
        Self::Keyword,
        Self::Identifier,
        Self::String,
        Self::Number,
        Self::Comment,
        Self::Operator,
        Self::Punctuation,
        Self::Plain,
    ];

    /// Lowercase name, as used in theme files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Identifier => "identifier",
            Self::String => "string",
            Self::Number => "number",
            Self::Comment => "comment",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::Plain => "plain",
        }
    }
}

/// A contiguous character range on one line, tagged with a lexical category.
///
/// `start..end` are character columns (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    /// Line index.
    pub line: usize,
    /// Start column (inclusive).
    pub start: usize,
    /// End column (exclusive).
    pub end: usize,
    /// Lexical category.
    pub category: TokenCategory,
}

impl TokenSpan {
    /// Create a span.
    pub const fn new(line: usize, start: usize, end: usize, category: TokenCategory) -> Self {
        Self {
            line,
            start,
            end,
            category,
        }
    }

    /// Width in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for a zero-width span.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `column` falls inside the span.
    pub fn contains(&self, column: usize) -> bool {
        self.start <= column && column < self.end
    }
}

/// Returns `true` if `spans` are ordered, non-empty, contiguous and cover exactly
/// `[0, line_len)`.
pub fn spans_cover_line(spans: &[TokenSpan], line_len: usize) -> bool {
    let mut expected = 0;
    for span in spans {
        if span.start != expected || span.end <= span.start {
            return false;
        }
        expected = span.end;
    }
    expected == line_len
}
