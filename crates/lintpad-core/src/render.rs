//! Per-line render model.
//!
//! [`RenderLine::build`] merges the lexical spans of a line with the diagnostics anchored on it
//! and resolves every resulting range against a [`Theme`]. The result is a self-contained value
//! a view can paint without calling back into the core.
//!
//! Merge rules:
//! - token spans are split wherever a live (non-stale) diagnostic range starts or ends
//! - a live diagnostic overrides the lexical color (severity color + underline); the span keeps
//!   its lexical category so the style can be re-resolved later
//! - stale diagnostics are attached for hover and the gutter but never restyle text
//! - when several live diagnostics overlap, the most severe one wins

use crate::diagnostics::{Diagnostic, Severity};
use crate::theme::{Style, Theme};
use crate::token::{TokenCategory, TokenSpan};

/// A styled character range of a render line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledSpan {
    /// Start column (inclusive).
    pub start: usize,
    /// End column (exclusive).
    pub end: usize,
    /// Lexical category of the underlying token.
    pub category: TokenCategory,
    /// Severity of the overriding diagnostic, if any.
    pub severity: Option<Severity>,
    /// Style resolved from `category` and `severity`.
    pub style: Style,
}

/// A diagnostic placed on a render line, with its resolved column extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// The diagnostic.
    pub diagnostic: Diagnostic,
    /// Start column of the marked range.
    pub start: usize,
    /// End column of the marked range (exclusive).
    pub end: usize,
}

impl LineDiagnostic {
    fn place(diagnostic: &Diagnostic, line_len: usize, tokens: &[TokenSpan]) -> Self {
        let (start, end) = match diagnostic.column {
            None => (0, line_len),
            Some(column) => match diagnostic.end_column {
                Some(end) if end > column => (column, end),
                _ => tokens
                    .iter()
                    .find(|token| token.contains(column))
                    .map(|token| (token.start, token.end))
                    .unwrap_or((column, column + 1)),
            },
        };
        Self {
            diagnostic: diagnostic.clone(),
            start,
            end,
        }
    }

    /// `true` if the diagnostic has no column and applies to the whole line.
    pub fn is_line_level(&self) -> bool {
        self.diagnostic.column.is_none()
    }

    /// `true` if hovering `column` should show this diagnostic.
    pub fn covers(&self, column: usize) -> bool {
        self.is_line_level() || (self.start <= column && column < self.end)
    }
}

/// Gutter marker summarizing the diagnostics of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GutterMarker {
    /// Most severe severity among the contributing diagnostics.
    pub severity: Severity,
    /// Number of diagnostics on the line.
    pub count: usize,
    /// `true` if every diagnostic on the line is stale.
    pub stale: bool,
}

impl GutterMarker {
    fn summarize(diagnostics: &[LineDiagnostic]) -> Option<Self> {
        let live = diagnostics
            .iter()
            .filter(|d| !d.diagnostic.stale)
            .map(|d| d.diagnostic.severity)
            .min();
        let severity = live.or_else(|| diagnostics.iter().map(|d| d.diagnostic.severity).min())?;
        Some(Self {
            severity,
            count: diagnostics.len(),
            stale: live.is_none(),
        })
    }
}

/// Render instructions for one buffer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLine {
    /// Line index.
    pub line: usize,
    /// Buffer version the line was built from.
    pub version: u64,
    /// Line text (without the terminator).
    pub text: String,
    /// Contiguous styled spans covering the line.
    pub spans: Vec<StyledSpan>,
    /// Diagnostics anchored on the line, in display order.
    pub diagnostics: Vec<LineDiagnostic>,
    /// Gutter marker, if the line has diagnostics.
    pub gutter: Option<GutterMarker>,
}

impl RenderLine {
    /// Build the render model of `line`.
    ///
    /// `tokens` are the lexical spans of the line; diagnostics anchored on other lines are
    /// ignored, so callers may pass a whole diagnostic set.
    pub fn build(
        line: usize,
        text: &str,
        tokens: &[TokenSpan],
        diagnostics: &[Diagnostic],
        theme: &Theme,
        version: u64,
    ) -> Self {
        let line_len = text.chars().count();
        let mut placed: Vec<LineDiagnostic> = diagnostics
            .iter()
            .filter(|d| d.line == line)
            .map(|d| LineDiagnostic::place(d, line_len, tokens))
            .collect();
        placed.sort_by(|a, b| a.diagnostic.display_cmp(&b.diagnostic));

        let live: Vec<&LineDiagnostic> = placed.iter().filter(|d| !d.diagnostic.stale).collect();
        let mut spans = Vec::with_capacity(tokens.len());
        for token in tokens {
            let mut cuts = vec![token.start, token.end];
            for d in &live {
                for cut in [d.start, d.end] {
                    if token.start < cut && cut < token.end {
                        cuts.push(cut);
                    }
                }
            }
            cuts.sort_unstable();
            cuts.dedup();

            for pair in cuts.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let severity = live
                    .iter()
                    .filter(|d| d.start <= start && start < d.end)
                    .map(|d| d.diagnostic.severity)
                    .min();
                spans.push(StyledSpan {
                    start,
                    end,
                    category: token.category,
                    severity,
                    style: theme.resolve(token.category, severity),
                });
            }
        }

        let gutter = GutterMarker::summarize(&placed);
        Self {
            line,
            version,
            text: text.to_string(),
            spans,
            diagnostics: placed,
            gutter,
        }
    }

    /// Same line, styles re-resolved against another theme.
    pub fn restyled(&self, theme: &Theme) -> Self {
        let mut line = self.clone();
        for span in &mut line.spans {
            span.style = theme.resolve(span.category, span.severity);
        }
        line
    }

    /// Diagnostics to show when hovering `column`, in display order.
    pub fn hover(&self, column: usize) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.covers(column))
            .map(|d| &d.diagnostic)
            .collect()
    }
}

/// Diagnostics of `line` covering `column` (line-level diagnostics always match), ordered by
/// severity, then rule code, then column.
///
/// `tokens` are the lexical spans of `line`; they give column-only diagnostics their extent.
pub fn diagnostics_at(
    diagnostics: &[Diagnostic],
    tokens: &[TokenSpan],
    line: usize,
    column: usize,
) -> Vec<Diagnostic> {
    let line_len = tokens.last().map_or(0, |t| t.end);
    let mut found: Vec<Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.line == line)
        .map(|d| LineDiagnostic::place(d, line_len, tokens))
        .filter(|d| d.covers(column))
        .map(|d| d.diagnostic)
        .collect();
    found.sort_by(Diagnostic::display_cmp);
    found
}
