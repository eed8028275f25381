//! Declarative element locators
//!
//! The markup of the site under test is not controlled by the harness, so
//! elements are selected structurally: a CSS selector (tag, class,
//! attribute prefix), optionally narrowed by a text pattern, by a required
//! descendant, and by position.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};

/// A regular expression over element text.
///
/// Patterns are kept to the subset shared by Rust's `regex` and JavaScript
/// `RegExp`, since the Playwright driver evaluates them in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPattern {
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl TextPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    /// Case-insensitive pattern, the `/.../i` form.
    pub fn ci(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn to_regex(&self) -> E2eResult<Regex> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|e| E2eError::Pattern {
                pattern: self.pattern.clone(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, text: &str) -> E2eResult<bool> {
        Ok(self.to_regex()?.is_match(text))
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.pattern)?;
        if self.case_insensitive {
            f.write_str("i")?;
        }
        Ok(())
    }
}

fn default_css() -> String {
    "*".to_string()
}

/// Structural element selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// CSS selector
    #[serde(default = "default_css")]
    pub css: String,

    /// Text the element must contain (including descendants)
    #[serde(default)]
    pub text: Option<TextPattern>,

    /// Match on the element's own text nodes only, like a browser's
    /// get-by-text lookup. `css` is ignored when set.
    #[serde(default)]
    pub by_text: bool,

    /// CSS selector of a descendant the element must contain
    #[serde(default)]
    pub has: Option<String>,

    /// Keep only the n-th match (zero based)
    #[serde(default)]
    pub nth: Option<usize>,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
            by_text: false,
            has: None,
            nth: None,
        }
    }

    /// Elements whose own text matches `pattern`.
    pub fn text(pattern: TextPattern) -> Self {
        Self {
            css: default_css(),
            text: Some(pattern),
            by_text: true,
            has: None,
            nth: None,
        }
    }

    /// Narrow to elements whose text matches `pattern`.
    pub fn with_text(mut self, pattern: TextPattern) -> Self {
        self.text = Some(pattern);
        self
    }

    /// Narrow to elements containing a descendant matching `css`.
    pub fn has(mut self, css: impl Into<String>) -> Self {
        self.has = Some(css.into());
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_text {
            match &self.text {
                Some(text) => write!(f, "text={}", text)?,
                None => f.write_str("text=<any>")?,
            }
        } else {
            f.write_str(&self.css)?;
            if let Some(text) = &self.text {
                write!(f, " hasText={}", text)?;
            }
        }
        if let Some(has) = &self.has {
            write!(f, " has={}", has)?;
        }
        if let Some(nth) = self.nth {
            write!(f, " nth={}", nth)?;
        }
        Ok(())
    }
}
