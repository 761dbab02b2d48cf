//! Immutable color themes.
//!
//! A [`Theme`] maps lexical categories and diagnostic severities to display styles. Themes are
//! plain values: the render model receives one explicitly, so swapping themes only re-resolves
//! styles over existing token and diagnostic data.
//!
//! Theme files are flat JSON objects, one entry per style class:
//!
//! ```json
//! {
//!   "name": "darcula",
//!   "foreground": "#a9b7c6",
//!   "keyword": ["#cc7832", "bold"],
//!   "string": "#6a8759",
//!   "error": { "color": "#bc3f3c", "underline": true }
//! }
//! ```
//!
//! Legacy highlighter keys are accepted as aliases (`brace`, `numbers`, `string2`, `builtins`,
//! `self`, `dunder`, `defclass`, `kwargs`, `todo`); a canonical key always wins over an alias.

use crate::diagnostics::Severity;
use crate::token::TokenCategory;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading a theme.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// The file is not valid JSON (or not an object).
    #[error("theme JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file could not be read.
    #[error("theme I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A color string is not `#rgb` / `#rrggbb`.
    #[error("invalid color '{value}' for '{key}'")]
    InvalidColor {
        /// Entry key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// An entry has an unsupported shape.
    #[error("invalid style entry for '{0}'")]
    InvalidEntry(String),
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Create a color from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Resolved display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color; `None` means the theme foreground.
    pub color: Option<Color>,
    /// Bold weight.
    pub bold: bool,
    /// Italic.
    pub italic: bool,
    /// Underlined (diagnostics).
    pub underline: bool,
}

impl Style {
    /// A style with only a color.
    pub const fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            bold: false,
            italic: false,
            underline: false,
        }
    }

    /// Same style, bold.
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Same style, italic.
    pub const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Same style, underlined.
    pub const fn underline(mut self) -> Self {
        self.underline = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StyleEntry {
    Color(String),
    Pair(Vec<String>),
    Full {
        color: Option<String>,
        #[serde(default)]
        bold: bool,
        #[serde(default)]
        italic: bool,
        #[serde(default)]
        underline: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum StyleTarget {
    Category(TokenCategory),
    Severity(Severity),
}

fn style_target(key: &str) -> Option<(StyleTarget, bool)> {
    use StyleTarget::{Category, Severity as Sev};
    use TokenCategory as C;

    let canonical = TokenCategory::ALL
        .iter()
        .find(|c| c.as_str() == key)
        .map(|c| Category(*c))
        .or_else(|| {
            Severity::ALL
                .iter()
                .find(|s| s.as_str() == key)
                .map(|s| Sev(*s))
        });
    if let Some(target) = canonical {
        return Some((target, true));
    }

    let alias = match key {
        "keywords" => Category(C::Keyword),
        "builtins" | "self" | "dunder" | "defclass" | "kwargs" => Category(C::Identifier),
        "string2" | "strings" => Category(C::String),
        "numbers" => Category(C::Number),
        "todo" => Category(C::Comment),
        "operators" => Category(C::Operator),
        "brace" | "braces" => Category(C::Punctuation),
        "text" => Category(C::Plain),
        _ => return None,
    };
    Some((alias, false))
}

/// Immutable theme value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    foreground: Color,
    background: Option<Color>,
    categories: BTreeMap<TokenCategory, Style>,
    severities: BTreeMap<Severity, Style>,
}

impl Default for Theme {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(TokenCategory::Keyword, Style::color(Color::rgb(0xcc, 0x78, 0x32)).bold());
        categories.insert(TokenCategory::Identifier, Style::color(Color::rgb(0xa9, 0xb7, 0xc6)));
        categories.insert(TokenCategory::String, Style::color(Color::rgb(0x6a, 0x87, 0x59)));
        categories.insert(TokenCategory::Number, Style::color(Color::rgb(0x68, 0x97, 0xbb)));
        categories.insert(
            TokenCategory::Comment,
            Style::color(Color::rgb(0x80, 0x80, 0x80)).italic(),
        );
        categories.insert(TokenCategory::Operator, Style::color(Color::rgb(0xa9, 0xb7, 0xc6)));
        categories.insert(TokenCategory::Punctuation, Style::color(Color::rgb(0xa9, 0xb7, 0xc6)));

        let mut severities = BTreeMap::new();
        severities.insert(Severity::Error, Style::color(Color::rgb(0x80, 0x00, 0x00)).underline());
        severities.insert(Severity::Warning, Style::color(Color::rgb(0x80, 0x80, 0x00)).underline());
        severities.insert(
            Severity::Convention,
            Style::color(Color::rgb(0x00, 0x60, 0x10)).underline(),
        );
        severities.insert(Severity::Info, Style::color(Color::rgb(0x30, 0x60, 0xa0)).underline());

        Self {
            name: "default".to_string(),
            foreground: Color::rgb(0xa9, 0xb7, 0xc6),
            background: Some(Color::rgb(0x2b, 0x2b, 0x2b)),
            categories,
            severities,
        }
    }
}

impl Theme {
    /// Parse a theme from JSON text. Entries missing from the file keep the default style.
    pub fn from_json_str(text: &str) -> Result<Self, ThemeError> {
        let raw: BTreeMap<String, Value> = serde_json::from_str(text)?;
        let mut theme = Self::default();
        let mut from_canonical = BTreeMap::<StyleTarget, bool>::new();

        for (key, value) in raw {
            match key.as_str() {
                "name" => {
                    theme.name = value
                        .as_str()
                        .ok_or_else(|| ThemeError::InvalidEntry(key.clone()))?
                        .to_string();
                    continue;
                }
                "foreground" | "background" => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| ThemeError::InvalidEntry(key.clone()))?;
                    let color = parse_color(&key, text)?;
                    if key == "foreground" {
                        theme.foreground = color;
                    } else {
                        theme.background = Some(color);
                    }
                    continue;
                }
                _ => {}
            }

            let Some((target, canonical)) = style_target(&key) else {
                tracing::debug!(key = key.as_str(), "ignoring unknown theme entry");
                continue;
            };
            if from_canonical.get(&target).is_some_and(|seen| *seen || !canonical) {
                continue;
            }

            let entry: StyleEntry = serde_json::from_value(value)
                .map_err(|_| ThemeError::InvalidEntry(key.clone()))?;
            let mut style = style_from_entry(&key, entry)?;
            match target {
                StyleTarget::Category(category) => {
                    theme.categories.insert(category, style);
                }
                StyleTarget::Severity(severity) => {
                    style.underline = true;
                    theme.severities.insert(severity, style);
                }
            }
            from_canonical.insert(target, canonical);
        }

        Ok(theme)
    }

    /// Load a theme from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ThemeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Theme name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default foreground color.
    pub fn foreground(&self) -> Color {
        self.foreground
    }

    /// Background color, if the theme defines one.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Style for a lexical category (plain text uses the foreground).
    pub fn category_style(&self, category: TokenCategory) -> Style {
        self.categories
            .get(&category)
            .copied()
            .unwrap_or(Style::color(self.foreground))
    }

    /// Style for a diagnostic severity.
    pub fn severity_style(&self, severity: Severity) -> Style {
        self.severities
            .get(&severity)
            .copied()
            .unwrap_or(Style::color(self.foreground).underline())
    }

    /// Resolve the style of a character range: the diagnostic severity (if any) takes the color
    /// and underline, the lexical category keeps its weight and slant.
    pub fn resolve(&self, category: TokenCategory, severity: Option<Severity>) -> Style {
        let base = self.category_style(category);
        match severity {
            None => base,
            Some(severity) => {
                let overlay = self.severity_style(severity);
                Style {
                    color: overlay.color.or(base.color),
                    bold: base.bold || overlay.bold,
                    italic: base.italic || overlay.italic,
                    underline: true,
                }
            }
        }
    }
}

fn parse_color(key: &str, text: &str) -> Result<Color, ThemeError> {
    Color::parse(text).ok_or_else(|| ThemeError::InvalidColor {
        key: key.to_string(),
        value: text.to_string(),
    })
}

fn style_from_entry(key: &str, entry: StyleEntry) -> Result<Style, ThemeError> {
    match entry {
        StyleEntry::Color(color) => Ok(Style::color(parse_color(key, &color)?)),
        StyleEntry::Pair(parts) => {
            let Some((color, flags)) = parts.split_first() else {
                return Err(ThemeError::InvalidEntry(key.to_string()));
            };
            let flags = flags.join(" ");
            Ok(Style {
                color: Some(parse_color(key, color)?),
                bold: flags.contains("bold"),
                italic: flags.contains("italic"),
                underline: flags.contains("underline"),
            })
        }
        StyleEntry::Full {
            color,
            bold,
            italic,
            underline,
        } => Ok(Style {
            color: color.map(|c| parse_color(key, &c)).transpose()?,
            bold,
            italic,
            underline,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colors() {
        assert_eq!(Color::parse("#fff"), Some(Color::rgb(255, 255, 255)));
        assert_eq!(Color::parse("cc7832"), Some(Color::rgb(0xcc, 0x78, 0x32)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#zzz"), None);
        assert_eq!(Color::rgb(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn test_legacy_highlighter_file() {
        let theme = Theme::from_json_str(
            r##"{
                "keyword": ["#000080", "bold"],
                "brace": ["darkgray"],
                "numbers": ["#800080"],
                "number": ["#ff00ff", "italic"],
                "todo_author": ["#ff0000"]
            }"##,
        );
        // "darkgray" is a Qt color name, not a hex value.
        assert!(matches!(theme, Err(ThemeError::InvalidColor { .. })));

        let theme = Theme::from_json_str(
            r##"{
                "keyword": ["#000080", "bold"],
                "numbers": ["#800080"],
                "number": ["#ff00ff", "italic"],
                "todo_author": ["#ff0000"]
            }"##,
        )
        .unwrap();
        assert_eq!(
            theme.category_style(TokenCategory::Keyword),
            Style::color(Color::rgb(0, 0, 0x80)).bold()
        );
        assert_eq!(
            theme.category_style(TokenCategory::Number),
            Style::color(Color::rgb(0xff, 0, 0xff)).italic()
        );
    }

    #[test]
    fn test_severity_overrides_color_but_keeps_weight() {
        let theme = Theme::default();
        let style = theme.resolve(TokenCategory::Keyword, Some(Severity::Error));
        assert_eq!(style.color, Some(Color::rgb(0x80, 0, 0)));
        assert!(style.bold);
        assert!(style.underline);
        assert!(!theme.resolve(TokenCategory::Keyword, None).underline);
    }
}
