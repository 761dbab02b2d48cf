//! Lint diagnostics and their remapping across buffer versions.
//!
//! A [`DiagnosticSet`] is always tagged with the buffer version it refers to. When the buffer
//! moves on, the set is carried forward edit by edit with [`DiagnosticSet::remap_through`] (or in
//! one go with [`DiagnosticSet::catch_up`]) so markers never drift onto the wrong line:
//!
//! - lines before an edit keep their diagnostics as-is
//! - lines after an edit shift by the edit's line delta
//! - lines deleted together with their line break lose their diagnostics
//! - lines whose own text was edited keep their diagnostics, flagged [`Diagnostic::stale`]

use crate::buffer::Position;
use crate::edit::{Edit, EditLog, shift_line};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Diagnostic severity levels, most severe first.
///
/// The derived ordering sorts `Error` before `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Errors (and fatal tool messages).
    Error,
    /// Warnings.
    Warning,
    /// Style conventions and refactoring hints.
    Convention,
    /// Informational messages.
    Info,
}

impl Severity {
    /// Every severity, most severe first.
    pub const ALL: [Severity; 4] = [Self::Error, Self::Warning, Self::Convention, Self::Info];

    /// Parse a tool severity code.
    ///
    /// Accepts full names and pylint's one-letter categories (case-insensitive):
    /// `error|E|fatal|F`, `warning|W`, `convention|C|refactor|R`, `info|I|information|hint`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "error" | "e" | "fatal" | "f" => Some(Self::Error),
            "warning" | "w" => Some(Self::Warning),
            "convention" | "c" | "refactor" | "r" => Some(Self::Convention),
            "info" | "i" | "information" | "hint" => Some(Self::Info),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Convention => "convention",
            Self::Info => "info",
        }
    }

    /// `true` if `self` outranks `other`.
    pub fn is_more_severe_than(self, other: Severity) -> bool {
        self < other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown severity code: {s}"))
    }
}

/// One finding reported by the analysis tool.
///
/// Coordinates are 0-based (`line`, `column` in characters); tool output is converted at the
/// parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Anchor line.
    pub line: usize,
    /// Anchor column, if the tool reported one.
    pub column: Option<usize>,
    /// Exclusive end column on the anchor line, if the tool reported one.
    pub end_column: Option<usize>,
    /// Human-readable message.
    pub message: String,
    /// Rule code (e.g. `W0612`).
    pub code: Option<String>,
    /// Symbolic rule name (e.g. `unused-variable`).
    pub symbol: Option<String>,
    /// Set once the anchor line has been edited since the diagnostic was computed.
    pub stale: bool,
}

impl Diagnostic {
    /// Create a line-level diagnostic.
    pub fn new(severity: Severity, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            column: None,
            end_column: None,
            message: message.into(),
            code: None,
            symbol: None,
            stale: false,
        }
    }

    /// Attach an anchor column.
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Attach an end column.
    pub fn with_end_column(mut self, end_column: usize) -> Self {
        self.end_column = Some(end_column);
        self
    }

    /// Attach a rule code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a symbolic rule name.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Carry the diagnostic across one edit.
    ///
    /// On [`RemapOutcome::Dropped`] the diagnostic is left untouched and the caller is expected to
    /// discard it.
    pub fn remap_through(&mut self, edit: &Edit) -> RemapOutcome {
        let line = self.line;
        let line_start = Position::new(line, 0);

        if edit.deleted_text.is_empty() && edit.inserted_text.is_empty() {
            return RemapOutcome::Kept;
        }
        if line < edit.start.line {
            return RemapOutcome::Kept;
        }
        if line > edit.old_end.line {
            let shifted = shift_line(line, edit.line_delta());
            if shifted == line {
                return RemapOutcome::Kept;
            }
            self.line = shifted;
            return RemapOutcome::Shifted;
        }

        // New lines opened after the end of the anchor line.
        if line == edit.start.line
            && edit.is_insertion()
            && edit.start.column == edit.start_line_len
            && edit.inserted_text.starts_with('\n')
        {
            return RemapOutcome::Kept;
        }

        // The anchor line begins exactly where the edit ended: whole lines were inserted or removed
        // in front of it and its own text is intact.
        if edit.old_end == line_start
            && (edit.inserted_text.is_empty() || edit.inserted_text.ends_with('\n'))
        {
            let shift = edit.new_end.column;
            self.line = edit.new_end.line;
            self.column = self.column.map(|c| c + shift);
            self.end_column = self.end_column.map(|c| c + shift);
            return if self.line == line && shift == 0 {
                RemapOutcome::Kept
            } else {
                RemapOutcome::Shifted
            };
        }

        if edit.start <= line_start && edit.old_end.line > line {
            return RemapOutcome::Dropped;
        }

        let anchor = edit.map_position(Position::new(line, self.column.unwrap_or(0)));
        if let Some(end) = self.end_column {
            let mapped_end = edit.map_position(Position::new(line, end));
            self.end_column = (mapped_end.line == anchor.line && mapped_end.column > anchor.column)
                .then_some(mapped_end.column);
        }
        self.line = anchor.line;
        if self.column.is_some() {
            self.column = Some(anchor.column);
        }
        self.stale = true;
        RemapOutcome::Stale
    }

    /// Display ordering: severity, then rule code (coded before uncoded), then column, then
    /// message.
    pub fn display_cmp(&self, other: &Diagnostic) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| match (&self.code, &other.code) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.message.cmp(&other.message))
    }
}

/// What happened to a diagnostic when it was carried across an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapOutcome {
    /// Location unchanged.
    Kept,
    /// Moved to another line/column; the anchor text is intact.
    Shifted,
    /// The anchor line itself was edited; kept and flagged.
    Stale,
    /// The anchor line was deleted.
    Dropped,
}

/// Counters returned by set-level remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemapSummary {
    /// Diagnostics that changed location.
    pub shifted: usize,
    /// Diagnostics newly flagged stale.
    pub stale: usize,
    /// Diagnostics removed with their line.
    pub dropped: usize,
}

impl RemapSummary {
    /// Returns `true` if any diagnostic moved, went stale or was dropped.
    pub fn is_changed(&self) -> bool {
        self.shifted + self.stale + self.dropped > 0
    }

    fn record(&mut self, outcome: RemapOutcome) {
        match outcome {
            RemapOutcome::Kept => {}
            RemapOutcome::Shifted => self.shifted += 1,
            RemapOutcome::Stale => self.stale += 1,
            RemapOutcome::Dropped => self.dropped += 1,
        }
    }
}

/// Diagnostics for one buffer, tagged with the version they refer to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagnosticSet {
    version: u64,
    items: Vec<Diagnostic>,
}

impl DiagnosticSet {
    /// Create a set computed against `version`.
    pub fn new(version: u64, items: Vec<Diagnostic>) -> Self {
        Self { version, items }
    }

    /// Buffer version the locations refer to.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All diagnostics.
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Consume the set.
    pub fn into_items(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Diagnostics anchored on `line`.
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.line == line)
    }

    /// Sorted, deduplicated anchor lines.
    pub fn lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self.items.iter().map(|d| d.line).collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Carry the set across `edit`. Edits that do not start at the set's version are ignored.
    pub fn remap_through(&mut self, edit: &Edit) -> RemapSummary {
        let mut summary = RemapSummary::default();
        if edit.version_before != self.version {
            tracing::debug!(
                set_version = self.version,
                edit_version = edit.version_before,
                "skipping edit that does not apply to diagnostic set"
            );
            return summary;
        }

        self.items.retain_mut(|diagnostic| {
            let outcome = diagnostic.remap_through(edit);
            summary.record(outcome);
            outcome != RemapOutcome::Dropped
        });
        self.version = edit.version_after;
        summary
    }

    /// Carry the set across every edit in `log` that was applied after the set's version.
    ///
    /// If the log no longer reaches back to the set's version, every diagnostic is flagged stale
    /// and the set is moved to `current_version` as-is.
    pub fn catch_up(&mut self, log: &EditLog, current_version: u64) -> RemapSummary {
        let mut summary = RemapSummary::default();
        let Some(edits) = log.since(self.version) else {
            tracing::warn!(
                set_version = self.version,
                current_version,
                "edit log does not reach diagnostic version; marking stale"
            );
            for diagnostic in &mut self.items {
                if !diagnostic.stale {
                    diagnostic.stale = true;
                    summary.stale += 1;
                }
            }
            self.version = current_version;
            return summary;
        };

        for edit in edits {
            let step = self.remap_through(edit);
            summary.shifted += step.shifted;
            summary.stale += step.stale;
            summary.dropped += step.dropped;
        }
        summary
    }
}
