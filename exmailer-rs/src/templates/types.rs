//! Template selector and layout types

use crate::error::{ExMailerError, Result};
use std::fmt;
use std::str::FromStr;

/// Marker a layout uses to place the message body
pub const BODY_MARKER: &str = "{body}";

/// Layouts shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownTemplate {
    /// Left-to-right English layout
    Default,
    /// Right-to-left Persian layout
    Persian,
    /// Bare HTML page with basic styling
    Minimal,
    /// No layout, the body is sent as is
    Plain,
}

impl WellKnownTemplate {
    /// Registry key of the layout, `None` for [`WellKnownTemplate::Plain`]
    pub fn canonical_name(&self) -> Option<&'static str> {
        match self {
            WellKnownTemplate::Default => Some("default"),
            WellKnownTemplate::Persian => Some("persian"),
            WellKnownTemplate::Minimal => Some("minimal"),
            WellKnownTemplate::Plain => None,
        }
    }

    /// Names the layout is registered under, canonical name first
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            WellKnownTemplate::Default => &["default", "english", "ltr", "en"],
            WellKnownTemplate::Persian => &["persian", "farsi", "rtl", "fa"],
            WellKnownTemplate::Minimal => &["minimal", "simple"],
            WellKnownTemplate::Plain => &["plain", "none"],
        }
    }
}

/// Picks the layout a message is wrapped in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSelector {
    WellKnown(WellKnownTemplate),
    Named(String),
}

impl TemplateSelector {
    pub fn plain() -> Self {
        TemplateSelector::WellKnown(WellKnownTemplate::Plain)
    }

    /// Normalized registry key, or `None` when no layout should be applied
    pub fn lookup_key(&self) -> Option<String> {
        match self {
            TemplateSelector::WellKnown(known) => known.canonical_name().map(str::to_string),
            TemplateSelector::Named(name) => {
                let key = normalize_name(name);
                if is_plain_name(&key) {
                    None
                } else {
                    Some(key)
                }
            }
        }
    }
}

impl Default for TemplateSelector {
    fn default() -> Self {
        TemplateSelector::WellKnown(WellKnownTemplate::Persian)
    }
}

impl From<WellKnownTemplate> for TemplateSelector {
    fn from(known: WellKnownTemplate) -> Self {
        TemplateSelector::WellKnown(known)
    }
}

impl From<&str> for TemplateSelector {
    fn from(name: &str) -> Self {
        if is_plain_name(&normalize_name(name)) {
            TemplateSelector::plain()
        } else {
            TemplateSelector::Named(name.to_string())
        }
    }
}

impl From<String> for TemplateSelector {
    fn from(name: String) -> Self {
        TemplateSelector::from(name.as_str())
    }
}

impl FromStr for TemplateSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(TemplateSelector::from(s))
    }
}

impl fmt::Display for TemplateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSelector::WellKnown(known) => {
                f.write_str(known.canonical_name().unwrap_or("plain"))
            }
            TemplateSelector::Named(name) => f.write_str(name),
        }
    }
}

/// HTML wrapper with a single [`BODY_MARKER`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    name: String,
    html: String,
}

impl Layout {
    /// Validate and build a layout
    pub fn new(name: impl Into<String>, html: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let html = html.into();

        let markers = html.matches(BODY_MARKER).count();
        if markers != 1 {
            return Err(ExMailerError::InvalidLayout { name, markers });
        }

        Ok(Self { name, html })
    }

    /// Built-in layouts are checked by the registry tests instead
    pub(crate) fn builtin(name: &str, html: &str) -> Self {
        Self {
            name: name.to_string(),
            html: html.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn is_plain_name(key: &str) -> bool {
    WellKnownTemplate::Plain.synonyms().contains(&key)
}
