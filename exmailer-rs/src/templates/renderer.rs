//! Template rendering with variable substitution

use crate::error::{ExMailerError, Result};
use crate::templates::types::{Layout, BODY_MARKER};
use std::collections::HashMap;

/// A piece of text split into literal runs and `{name}` placeholders
enum Segment<'a> {
    Literal(&'a str),
    Escaped(char),
    Placeholder(&'a str),
}

/// Renders message bodies by interpolating variables and applying a layout
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a message body
    ///
    /// Variables are substituted first, and only when `vars` is given. The
    /// result is then placed into `layout`, so markup coming from the layout
    /// never goes through substitution.
    pub fn render(
        body: &str,
        vars: Option<&HashMap<String, String>>,
        layout: Option<&Layout>,
    ) -> Result<String> {
        let body = match vars {
            Some(vars) => Self::interpolate(body, vars)?,
            None => body.to_string(),
        };

        Ok(match layout {
            Some(layout) => Self::wrap(layout, &body),
            None => body,
        })
    }

    /// Replace every `{name}` placeholder with its value from `vars`
    ///
    /// `{{` and `}}` produce literal braces. Braces around anything that is
    /// not an identifier are copied unchanged.
    pub fn interpolate(text: &str, vars: &HashMap<String, String>) -> Result<String> {
        let mut result = String::with_capacity(text.len());

        for segment in Self::segments(text) {
            match segment {
                Segment::Literal(s) => result.push_str(s),
                Segment::Escaped(c) => result.push(c),
                Segment::Placeholder(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| ExMailerError::MissingVariable(name.to_string()))?;
                    result.push_str(value);
                }
            }
        }

        Ok(result)
    }

    /// Put `body` in place of the layout's body marker
    pub fn wrap(layout: &Layout, body: &str) -> String {
        match layout.html().split_once(BODY_MARKER) {
            Some((head, tail)) => {
                let mut result = String::with_capacity(head.len() + body.len() + tail.len());
                result.push_str(head);
                result.push_str(body);
                result.push_str(tail);
                result
            }
            None => layout.html().to_string(),
        }
    }

    /// Placeholder names used in `text`, sorted and without duplicates
    pub fn extract_variables(text: &str) -> Vec<String> {
        let mut variables: Vec<String> = Self::segments(text)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.to_string()),
                _ => None,
            })
            .collect();

        variables.sort();
        variables.dedup();
        variables
    }

    fn segments(text: &str) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let bytes = text.as_bytes();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                    segments.push(Segment::Literal(&text[literal_start..i]));
                    segments.push(Segment::Escaped(bytes[i] as char));
                    i += 2;
                    literal_start = i;
                }
                b'{' => match Self::placeholder_at(text, i + 1) {
                    Some(name) => {
                        segments.push(Segment::Literal(&text[literal_start..i]));
                        segments.push(Segment::Placeholder(name));
                        i += name.len() + 2;
                        literal_start = i;
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }

        segments.push(Segment::Literal(&text[literal_start..]));
        segments
    }

    /// Identifier starting at `start` and closed by `}`
    ///
    /// Scanning stops at the first byte that cannot be part of an identifier.
    fn placeholder_at(text: &str, start: usize) -> Option<&str> {
        let bytes = text.as_bytes();
        let first = *bytes.get(start)?;
        if !(first.is_ascii_alphabetic() || first == b'_') {
            return None;
        }

        let len = bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
        let end = start + len;

        (bytes.get(end) == Some(&b'}')).then(|| &text[start..end])
    }
}
