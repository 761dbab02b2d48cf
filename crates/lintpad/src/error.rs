//! Coordinator errors.

use lintpad_core::{BufferError, Position, Range, ThemeError};
use lintpad_highlight::GrammarError;
use thiserror::Error;

/// Errors returned by [`Coordinator`](crate::Coordinator) operations.
///
/// Analysis failures are not errors: they are reported as a diagnostics status notification.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// No document is open.
    #[error("no document is open")]
    NoDocument,
    /// A buffer coordinate did not exist.
    #[error(transparent)]
    Buffer(#[from] BufferError),
    /// The grammar for the document language failed to compile.
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    /// A theme file could not be loaded.
    #[error(transparent)]
    Theme(#[from] ThemeError),
    /// The deleted range of an edit does not start at the edit position.
    #[error("edit at {position:?} does not match deleted range {range:?}")]
    EditMismatch {
        /// Edit position.
        position: Position,
        /// Deleted range.
        range: Range,
    },
}
