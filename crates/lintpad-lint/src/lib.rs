#![warn(missing_docs)]
//! lintpad-lint - external static-analysis runs for lintpad.
//!
//! # Overview
//!
//! - [`ToolConfig`] describes a command line tool: program, argument template, input mode,
//!   output format and accepted exit codes. [`ToolConfig::pylint`] is the built-in preset.
//! - [`AnalysisRunner`] is the seam between a session and whatever produces diagnostics;
//!   [`ExternalTool`] spawns the configured process, tests plug in scripted runners.
//! - [`DiagnosticsSession`] keeps at most one run in flight per buffer, runs it on a worker
//!   thread, enforces a deadline and discards results of superseded runs.
//!
//! Tool output is normalized to 0-based [`Diagnostic`](lintpad_core::Diagnostic) coordinates by
//! [`parse_output`].

pub mod config;
pub mod error;
pub mod parse;
pub mod runner;
pub mod session;

pub use config::{ColumnBase, InputMode, OutputFormat, ToolConfig};
pub use error::AnalysisError;
pub use parse::parse_output;
pub use runner::{AnalysisRunner, CancelToken, DEFAULT_ANALYSIS_TIMEOUT, ExternalTool};
pub use session::{
    AnalysisHandle, AnalysisRequest, DiagnosticsSession, SessionEvent, SessionState,
};
