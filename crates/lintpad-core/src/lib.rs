#![warn(missing_docs)]
//! lintpad-core - headless data model of a lint-aware code editing surface.
//!
//! # Overview
//!
//! `lintpad-core` holds everything about a document that does not involve threads or external
//! processes:
//!
//! - [`Buffer`]: rope-backed text with a monotonically increasing version; every mutation returns
//!   a structured [`Edit`]
//! - [`TokenSpan`] / [`TokenCategory`]: the lexical vocabulary shared with the highlighter
//! - [`Diagnostic`] / [`DiagnosticSet`]: lint results tagged with the version they describe, and
//!   the rules that carry them across edits
//! - [`Theme`]: immutable category/severity styles loaded from JSON
//! - [`RenderLine`]: the per-line merge of tokens, diagnostics and theme handed to a view
//!
//! # Example
//!
//! ```rust
//! use lintpad_core::{Buffer, Diagnostic, DiagnosticSet, Position, Range, Severity};
//!
//! let mut buffer = Buffer::from_text("import os\nx = 1\n");
//! let mut set = DiagnosticSet::new(
//!     buffer.version(),
//!     vec![Diagnostic::new(Severity::Warning, 1, "unused").with_column(0)],
//! );
//!
//! let edit = buffer
//!     .delete(Range::new(Position::new(0, 0), Position::new(1, 0)))
//!     .unwrap();
//! set.remap_through(&edit);
//!
//! assert_eq!(set.items()[0].line, 0);
//! assert!(!set.items()[0].stale);
//! ```

pub mod buffer;
pub mod diagnostics;
pub mod edit;
pub mod render;
pub mod theme;
pub mod token;

pub use buffer::{
    Buffer, BufferError, DEFAULT_TAB_WIDTH, LineEnding, Position, Range, Snapshot, display_width,
    end_position,
};
pub use diagnostics::{Diagnostic, DiagnosticSet, RemapOutcome, RemapSummary, Severity};
pub use edit::{Edit, EditLog};
pub use render::{GutterMarker, LineDiagnostic, RenderLine, StyledSpan, diagnostics_at};
pub use theme::{Color, Style, Theme, ThemeError};
pub use token::{TokenCategory, TokenSpan, spans_cover_line};
