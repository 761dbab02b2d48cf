//! Coordinator configuration.

use lintpad_lint::ToolConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Not valid JSON, or unknown/mistyped fields.
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A value is out of range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Coordinator settings, loadable from JSON.
///
/// Every field is optional in the file; unknown fields are rejected.
///
/// ```json
/// {
///   "debounce_ms": 300,
///   "python_bin": "/usr/bin/python3.12",
///   "tools": { "json": { "program": "jsonlint-lintpad", "output": "text" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintpadConfig {
    /// Quiet period after the last edit before analysis starts.
    pub debounce_ms: u64,
    /// Deadline of one analysis run.
    pub analysis_timeout_ms: u64,
    /// Tab width for display columns.
    pub tab_width: usize,
    /// Number of lines visible after a document is opened.
    pub visible_lines: usize,
    /// Python interpreter used by the pylint preset.
    pub python_bin: String,
    /// Analysis tools by language identifier.
    pub tools: BTreeMap<String, ToolConfig>,
}

impl Default for LintpadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            analysis_timeout_ms: 20_000,
            tab_width: lintpad_core::DEFAULT_TAB_WIDTH,
            visible_lines: 100,
            python_bin: "python3".to_string(),
            tools: BTreeMap::new(),
        }
    }
}

impl LintpadConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::Invalid {
                field: "tab_width",
                reason: "must be at least 1",
            });
        }
        if self.analysis_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "analysis_timeout_ms",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Debounce period.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Analysis deadline.
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    /// Tool for `language`: an explicit `tools` entry, else the pylint preset for Python.
    pub fn tool_for(&self, language: &str) -> Option<ToolConfig> {
        let language = language.trim().to_ascii_lowercase();
        if let Some(tool) = self.tools.get(&language) {
            return Some(tool.clone());
        }
        matches!(language.as_str(), "python" | "py" | "python3")
            .then(|| ToolConfig::pylint(self.python_bin.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LintpadConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LintpadConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.analysis_timeout(), Duration::from_secs(20));
        assert_eq!(config.tool_for("python").map(|t| t.program), Some("python3".to_string()));
        assert_eq!(config.tool_for("json"), None);
    }

    #[test]
    fn test_python_bin_feeds_preset() {
        let config =
            LintpadConfig::from_json_str(r#"{"python_bin": "/opt/py/bin/python", "debounce_ms": 50}"#)
                .unwrap();
        assert_eq!(
            config.tool_for("PY").map(|t| t.program),
            Some("/opt/py/bin/python".to_string())
        );
        assert_eq!(config.debounce_ms, 50);
    }

    #[test]
    fn test_rejects_unknown_and_invalid_fields() {
        assert!(matches!(
            LintpadConfig::from_json_str(r#"{"syntax_highlighter": "x.json"}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            LintpadConfig::from_json_str(r#"{"tab_width": 0}"#),
            Err(ConfigError::Invalid { field: "tab_width", .. })
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lintpad.json");
        std::fs::write(
            &path,
            r#"{"tools": {"python": {"program": "ruff", "args": ["check", "{file}"]}}}"#,
        )
        .unwrap();
        let config = LintpadConfig::from_path(&path).unwrap();
        assert_eq!(config.tool_for("python").map(|t| t.program), Some("ruff".to_string()));
    }
}
