#![warn(missing_docs)]
//! lintpad-highlight - regex grammar tokenizer with incremental line-state tracking.
//!
//! A [`Grammar`] turns one line of text into contiguous [`TokenSpan`](lintpad_core::TokenSpan)s,
//! carrying a [`LineState`] across lines for constructs such as triple-quoted strings. The
//! [`Highlighter`] caches spans and states per line and, after an edit, rescans only the lines
//! whose text or incoming state changed.
//!
//! ```rust
//! use lintpad_core::{Buffer, Position};
//! use lintpad_highlight::{Grammar, Highlighter};
//!
//! let mut buffer = Buffer::from_text("x = 1\ny = 2\n");
//! let mut highlighter = Highlighter::new(Grammar::for_language("python").unwrap());
//! highlighter.rebuild(&buffer).unwrap();
//!
//! let edit = buffer.insert(Position::new(0, 0), "'''\n").unwrap();
//! let changed = highlighter.retokenize_affected(&buffer, &edit).unwrap();
//! assert_eq!(changed.len(), 4);
//! ```

pub mod grammar;
pub mod highlighter;
pub mod tokenizer;

pub use grammar::{Grammar, GrammarError, LexRule, RegionRule};
pub use highlighter::Highlighter;
pub use tokenizer::LineState;
