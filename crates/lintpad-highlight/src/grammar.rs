//! Grammar tables: ordered lexical rules plus multi-line region rules.

use lintpad_core::TokenCategory;
use regex::Regex;
use thiserror::Error;

/// Errors produced while compiling a grammar table.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A pattern failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    Regex {
        /// Offending pattern.
        pattern: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },
    /// A capture group index that the pattern does not define.
    #[error("pattern '{pattern}' has no capture group {group}")]
    MissingGroup {
        /// Offending pattern.
        pattern: String,
        /// Requested group.
        group: usize,
    },
    /// A region opening pattern without a `delim` group.
    #[error("region pattern '{0}' has no named group 'delim'")]
    MissingDelimiter(String),
}

fn compile(pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|source| GrammarError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

/// A single-line lexical rule.
///
/// The rule applies when its pattern matches starting exactly at the current column. With a
/// capture group, only that group becomes the token (it must start at the current column); the
/// rest of the match acts as lookahead.
#[derive(Debug, Clone)]
pub struct LexRule {
    pub(crate) regex: Regex,
    pub(crate) category: TokenCategory,
    pub(crate) capture: Option<usize>,
}

impl LexRule {
    /// Compile a rule.
    pub fn new(pattern: &str, category: TokenCategory) -> Result<Self, GrammarError> {
        Ok(Self {
            regex: compile(pattern)?,
            category,
            capture: None,
        })
    }

    /// Emit only capture group `group` of each match.
    ///
    /// Example (JSON object key): pattern `("[^"]*")\s*:`, group `1`.
    pub fn with_capture(mut self, group: usize) -> Result<Self, GrammarError> {
        if group >= self.regex.captures_len() {
            return Err(GrammarError::MissingGroup {
                pattern: self.regex.as_str().to_string(),
                group,
            });
        }
        self.capture = Some(group);
        Ok(self)
    }

    /// Token category.
    pub fn category(&self) -> TokenCategory {
        self.category
    }
}

/// A construct that may span lines, such as a triple-quoted string.
///
/// The opening pattern must define a named group `delim`; the text it captures is the closing
/// delimiter. Inside the region, a character preceded by the escape character never closes it.
#[derive(Debug, Clone)]
pub struct RegionRule {
    pub(crate) open: Regex,
    pub(crate) category: TokenCategory,
    pub(crate) escape: Option<char>,
}

impl RegionRule {
    /// Compile a region rule.
    pub fn new(open: &str, category: TokenCategory) -> Result<Self, GrammarError> {
        let regex = compile(open)?;
        if !regex.capture_names().any(|name| name == Some("delim")) {
            return Err(GrammarError::MissingDelimiter(open.to_string()));
        }
        Ok(Self {
            open: regex,
            category,
            escape: None,
        })
    }

    /// Set the escape character.
    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Token category of the whole region.
    pub fn category(&self) -> TokenCategory {
        self.category
    }

    /// Byte offset just past the closing `delimiter`, searching from `from`.
    pub(crate) fn find_close(&self, text: &str, from: usize, delimiter: &str) -> Option<usize> {
        let mut chars = text[from..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            if Some(ch) == self.escape {
                chars.next();
                continue;
            }
            let at = from + offset;
            if text[at..].starts_with(delimiter) {
                return Some(at + delimiter.len());
            }
        }
        None
    }
}

/// A language grammar: region rules are tried first, then lexical rules in priority order.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    pub(crate) regions: Vec<RegionRule>,
    pub(crate) rules: Vec<LexRule>,
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

// Longest first, so `>>=` wins over `>>` and `>`.
const PYTHON_OPERATORS: &[&str] = &[
    ">>=", "<<=", "**=", "//=", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "^=", "|=",
    "&=", "~=", ">>", "<<", "**", "//", "=", "<", ">", "+", "-", "*", "/", "%", "^", "|", "&",
    "~",
];

const STRING_PREFIX: &str = "(?:[rRuUbBfF]|[fFbB][rR]|[rR][fFbB])?";

impl Grammar {
    /// Assemble a grammar from compiled rules.
    pub fn new(name: impl Into<String>, regions: Vec<RegionRule>, rules: Vec<LexRule>) -> Self {
        Self {
            name: name.into(),
            regions,
            rules,
        }
    }

    /// Grammar name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Region rules, in priority order.
    pub fn regions(&self) -> &[RegionRule] {
        &self.regions
    }

    /// Lexical rules, in priority order.
    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    /// No rules: every non-empty line is a single plain span.
    pub fn plain() -> Self {
        Self::new("plain", Vec::new(), Vec::new())
    }

    /// Python.
    ///
    /// Builtins and `self` are ordinary identifiers; triple-quoted strings (with any string
    /// prefix) are regions.
    pub fn python() -> Result<Self, GrammarError> {
        use TokenCategory::*;

        let keywords = format!(r"\b(?:{})\b", PYTHON_KEYWORDS.join("|"));
        let operators = PYTHON_OPERATORS
            .iter()
            .map(|op| regex::escape(op))
            .collect::<Vec<_>>()
            .join("|");

        let regions = vec![
            RegionRule::new(&format!(r#"{STRING_PREFIX}(?P<delim>'''|""")"#), String)?
                .with_escape('\\'),
        ];
        let rules = vec![
            LexRule::new(r"#.*", Comment)?,
            LexRule::new(&format!(r#"{STRING_PREFIX}"(?:\\.|[^"\\])*""#), String)?,
            LexRule::new(&format!(r#"{STRING_PREFIX}'(?:\\.|[^'\\])*'"#), String)?,
            // Unterminated single-line strings run to the end of the line.
            LexRule::new(&format!(r#"{STRING_PREFIX}["'].*"#), String)?,
            LexRule::new(
                r"(?:0[xX][0-9A-Fa-f]+|0[oO][0-7]+|0[bB][01]+|(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?)[jJlL]?",
                Number,
            )?,
            LexRule::new(&keywords, Keyword)?,
            LexRule::new(r"[\p{XID_Start}_]\p{XID_Continue}*", Identifier)?,
            LexRule::new(&operators, Operator)?,
            LexRule::new(r"[()\[\]{},:.;@]", Punctuation)?,
        ];
        Ok(Self::new("python", regions, rules))
    }

    /// JSON. Object keys are identifiers.
    pub fn json() -> Result<Self, GrammarError> {
        use TokenCategory::*;

        let rules = vec![
            LexRule::new(r#"("(?:\\.|[^"\\])*")\s*:"#, Identifier)?.with_capture(1)?,
            LexRule::new(r#""(?:\\.|[^"\\])*""#, String)?,
            LexRule::new(r#""(?:\\.|[^"\\])*$"#, String)?,
            LexRule::new(r"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?", Number)?,
            LexRule::new(r"\b(?:true|false|null)\b", Keyword)?,
            LexRule::new(r"[{}\[\],:]", Punctuation)?,
        ];
        Ok(Self::new("json", Vec::new(), rules))
    }

    /// Select a built-in grammar by language identifier, falling back to [`Grammar::plain`].
    pub fn for_language(language: &str) -> Result<Self, GrammarError> {
        match language.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Self::python(),
            "json" => Self::json(),
            other => {
                tracing::debug!(language = other, "no grammar for language; using plain");
                Ok(Self::plain())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_grammars_compile() {
        assert_eq!(Grammar::python().unwrap().name(), "python");
        assert_eq!(Grammar::json().unwrap().name(), "json");
        assert_eq!(Grammar::for_language("PY").unwrap().name(), "python");
        assert_eq!(Grammar::for_language("markdown").unwrap().name(), "plain");
    }

    #[test]
    fn test_malformed_tables_are_rejected() {
        assert!(matches!(
            LexRule::new("(", TokenCategory::Plain),
            Err(GrammarError::Regex { .. })
        ));
        assert!(matches!(
            LexRule::new("a", TokenCategory::Plain).unwrap().with_capture(1),
            Err(GrammarError::MissingGroup { .. })
        ));
        assert!(matches!(
            RegionRule::new("'''", TokenCategory::String),
            Err(GrammarError::MissingDelimiter(_))
        ));
    }

    #[test]
    fn test_find_close_honors_escape() {
        let region = RegionRule::new(r#"(?P<delim>""")"#, TokenCategory::String)
            .unwrap()
            .with_escape('\\');
        let text = r#"a \""" b""" c"#;
        assert_eq!(region.find_close(text, 0, "\"\"\""), Some(11));
    }
}
