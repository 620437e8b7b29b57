//! Element targets, resolved through accessible attributes
//!
//! Each target renders to a Playwright locator expression on `page`. All
//! user-provided text passes through [`js_string`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Raw CSS / Playwright selector
    Css(String),

    /// Input by its placeholder text
    Placeholder(String),

    /// Button by its visible text (accessible name)
    Button(String),

    /// Element by exact `aria-label`
    AriaLabel {
        #[serde(default)]
        tag: Option<String>,
        label: String,
    },

    /// Element containing the given text
    Text {
        #[serde(default)]
        tag: Option<String>,
        text: String,
    },
}

impl Target {
    pub fn aria_label(tag: &str, label: impl Into<String>) -> Self {
        Target::AriaLabel {
            tag: Some(tag.to_string()),
            label: label.into(),
        }
    }

    pub fn text(tag: &str, text: impl Into<String>) -> Self {
        Target::Text {
            tag: Some(tag.to_string()),
            text: text.into(),
        }
    }

    /// Playwright locator expression.
    pub fn locator(&self) -> String {
        match self {
            Target::Css(selector) => format!("page.locator({})", js_string(selector)),
            Target::Placeholder(text) => {
                format!("page.getByPlaceholder({}, {{ exact: true }})", js_string(text))
            }
            Target::Button(text) => {
                format!("page.getByRole('button', {{ name: {}, exact: true }})", js_string(text))
            }
            Target::AriaLabel { .. } => format!("page.locator({})", js_string(&self.css())),
            Target::Text { tag, text } => format!(
                "page.locator({}, {{ hasText: {} }})",
                js_string(tag.as_deref().unwrap_or("*")),
                js_string(text)
            ),
        }
    }

    /// CSS form, where one exists.
    pub fn css(&self) -> String {
        match self {
            Target::Css(selector) => selector.clone(),
            Target::Placeholder(text) => format!("input[placeholder=\"{}\"]", css_escape(text)),
            Target::Button(text) => format!("button:has-text(\"{}\")", css_escape(text)),
            Target::AriaLabel { tag, label } => format!(
                "{}[aria-label=\"{}\"]",
                tag.as_deref().unwrap_or(""),
                css_escape(label)
            ),
            Target::Text { tag, text } => format!(
                "{}:has-text(\"{}\")",
                tag.as_deref().unwrap_or("*"),
                css_escape(text)
            ),
        }
    }

    /// Short description for step names and logs.
    pub fn describe(&self) -> String {
        match self {
            Target::Css(selector) => selector.clone(),
            Target::Placeholder(text) => format!("placeholder={}", text),
            Target::Button(text) => format!("button={}", text),
            Target::AriaLabel { .. } => self.css(),
            Target::Text { tag, text } => {
                format!("{}~{}", tag.as_deref().unwrap_or("*"), text)
            }
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Quote `s` as a JS string literal.
pub fn js_string(s: &str) -> String {
    // Serialising a &str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

/// Escape a value for a double-quoted CSS attribute selector.
pub fn css_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}
