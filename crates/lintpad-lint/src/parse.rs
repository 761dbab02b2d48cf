//! Tool output parsing.
//!
//! Both formats are converted to 0-based [`Diagnostic`] coordinates here; nothing downstream
//! knows about tool conventions.

use crate::config::{ColumnBase, OutputFormat};
use crate::error::AnalysisError;
use lintpad_core::{Diagnostic, Severity};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(alias = "type", alias = "category")]
    severity: String,
    line: Option<u64>,
    column: Option<u64>,
    #[serde(default, alias = "endLine")]
    end_line: Option<u64>,
    #[serde(default, alias = "endColumn")]
    end_column: Option<u64>,
    message: String,
    #[serde(default, alias = "message-id", alias = "message_id")]
    code: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

// `path:line:col: C0114: message (symbol)`
static PYLINT_TEXT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<path>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<code>[A-Z]\d{4}):\s*(?P<message>.*?)(?:\s+\((?P<symbol>[a-z][\w-]*)\))?\s*$",
    )
});

// `path:line[:col]: kind (code, symbol, obj) message`
static PARSEABLE_TEXT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<path>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<kind>[A-Za-z]+)\b(?:\s*\((?P<code>[A-Z]\d+)?(?:,\s*(?P<symbol>[\w-]+))?[^)]*\))?\s*(?P<message>.*?)\s*$",
    )
});

/// Parse tool output into diagnostics anchored on a document of `line_count` lines.
///
/// Lines reported past the end of the document are clamped onto its last line.
pub fn parse_output(
    format: OutputFormat,
    column_base: ColumnBase,
    stdout: &str,
    line_count: usize,
) -> Result<Vec<Diagnostic>, AnalysisError> {
    let last_line = line_count.saturating_sub(1);
    let mut diagnostics = match format {
        OutputFormat::Json => parse_json(stdout, column_base)?,
        OutputFormat::Text => parse_text(stdout, column_base)?,
    };
    for diagnostic in &mut diagnostics {
        diagnostic.line = diagnostic.line.min(last_line);
    }
    Ok(diagnostics)
}

fn to_line(line: u64) -> usize {
    usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX)
}

fn parse_json(stdout: &str, column_base: ColumnBase) -> Result<Vec<Diagnostic>, AnalysisError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<JsonRecord> = serde_json::from_str(stdout)
        .map_err(|error| AnalysisError::MalformedOutput(error.to_string()))?;

    let mut diagnostics = Vec::with_capacity(records.len());
    for record in records {
        let Some(severity) = Severity::from_code(&record.severity) else {
            tracing::warn!(
                severity = record.severity.as_str(),
                "skipping record with unknown severity"
            );
            continue;
        };
        let line = record.line.map_or(0, to_line);
        let mut diagnostic = Diagnostic::new(severity, line, record.message);
        diagnostic.column = record.column.map(|c| column_base.normalize(c));
        let same_line = record.end_line.is_none_or(|end| to_line(end) == line);
        if same_line {
            diagnostic.end_column = record.end_column.map(|c| column_base.normalize(c));
        }
        diagnostic.code = record.code;
        diagnostic.symbol = record.symbol;
        diagnostics.push(diagnostic);
    }
    Ok(diagnostics)
}

fn parse_text(stdout: &str, column_base: ColumnBase) -> Result<Vec<Diagnostic>, AnalysisError> {
    let pylint = PYLINT_TEXT
        .as_ref()
        .map_err(|error| AnalysisError::MalformedOutput(error.to_string()))?;
    let parseable = PARSEABLE_TEXT
        .as_ref()
        .map_err(|error| AnalysisError::MalformedOutput(error.to_string()))?;

    let mut diagnostics = Vec::new();
    for raw in stdout.lines() {
        let raw = raw.trim_end();
        if raw.is_empty() {
            continue;
        }

        let (captures, severity) = if let Some(captures) = pylint.captures(raw) {
            let severity = captures
                .name("code")
                .and_then(|c| Severity::from_code(&c.as_str()[..1]));
            (captures, severity)
        } else if let Some(captures) = parseable.captures(raw) {
            let severity = captures
                .name("kind")
                .and_then(|k| Severity::from_code(k.as_str()));
            (captures, severity)
        } else {
            tracing::debug!(line = raw, "ignoring unrecognized tool output line");
            continue;
        };
        let Some(severity) = severity else {
            tracing::debug!(line = raw, "ignoring tool output line without severity");
            continue;
        };
        let Some(line) = captures
            .name("line")
            .and_then(|l| l.as_str().parse::<u64>().ok())
        else {
            continue;
        };

        let message = captures.name("message").map_or("", |m| m.as_str());
        let mut diagnostic = Diagnostic::new(severity, to_line(line), message);
        diagnostic.column = captures
            .name("col")
            .and_then(|c| c.as_str().parse::<u64>().ok())
            .map(|c| column_base.normalize(c));
        diagnostic.code = captures.name("code").map(|c| c.as_str().to_string());
        diagnostic.symbol = captures.name("symbol").map(|s| s.as_str().to_string());
        diagnostics.push(diagnostic);
    }
    Ok(diagnostics)
}
