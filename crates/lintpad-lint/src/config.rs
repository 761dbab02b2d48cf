//! External tool descriptions.

use serde::{Deserialize, Serialize};

/// How the analyzed text reaches the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Written to a temporary file whose path replaces `{file}` in the arguments.
    #[default]
    TempFile,
    /// Piped to standard input.
    Stdin,
}

/// Shape of the tool's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A JSON array of records (pylint `--output-format=json`).
    #[default]
    Json,
    /// One `path:line[:column]: ...` message per line.
    Text,
}

/// Base of the column numbers the tool reports. Lines are always 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnBase {
    /// First column is 0 (pylint).
    #[default]
    Zero,
    /// First column is 1.
    One,
}

impl ColumnBase {
    /// Convert a tool column to a 0-based column.
    pub fn normalize(self, column: u64) -> usize {
        let column = usize::try_from(column).unwrap_or(usize::MAX);
        match self {
            Self::Zero => column,
            Self::One => column.saturating_sub(1),
        }
    }
}

fn default_exit_codes() -> Vec<i32> {
    vec![0]
}

/// Description of an external analysis tool.
///
/// Arguments may contain `{file}` (path of the analyzed input) and `{language}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Program name or path, resolved through `PATH`.
    pub program: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Input mode.
    #[serde(default)]
    pub input: InputMode,
    /// Output format.
    #[serde(default)]
    pub output: OutputFormat,
    /// Column base of the output.
    #[serde(default)]
    pub column_base: ColumnBase,
    /// Exit codes that mean "analysis ran" (findings are not failures).
    #[serde(default = "default_exit_codes")]
    pub accepted_exit_codes: Vec<i32>,
    /// Temp file suffix, e.g. `.py`.
    #[serde(default)]
    pub file_suffix: Option<String>,
}

impl ToolConfig {
    /// A tool reading a temp file, JSON output, exit code 0 only.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            input: InputMode::default(),
            output: OutputFormat::default(),
            column_base: ColumnBase::default(),
            accepted_exit_codes: default_exit_codes(),
            file_suffix: None,
        }
    }

    /// pylint run as `python -m pylint` with JSON output.
    ///
    /// pylint's exit status is a bit mask of the message categories it emitted (1 fatal,
    /// 2 error, 4 warning, 8 refactor, 16 convention), so every value in `0..=31` is a
    /// completed run.
    pub fn pylint(python_bin: impl Into<String>) -> Self {
        Self {
            program: python_bin.into(),
            args: [
                "-m",
                "pylint",
                "--output-format=json",
                "--persistent=n",
                "{file}",
            ]
            .map(String::from)
            .to_vec(),
            input: InputMode::TempFile,
            output: OutputFormat::Json,
            column_base: ColumnBase::Zero,
            accepted_exit_codes: (0..=31).collect(),
            file_suffix: Some(".py".to_string()),
        }
    }

    /// Arguments with placeholders substituted.
    pub fn expand_args(&self, file: &str, language: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{file}", file).replace("{language}", language))
            .collect()
    }

    /// `true` if `code` is an accepted exit status.
    pub fn accepts_exit(&self, code: Option<i32>) -> bool {
        code.is_some_and(|code| self.accepted_exit_codes.contains(&code))
    }
}
