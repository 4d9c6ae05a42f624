//! Privacy filtering for text-bearing record fields
//!
//! Password fields never produce a preview. Everything else is cut to a
//! fixed number of characters before it leaves the page.

use crate::dom::ElementSnapshot;

/// Maximum preview length for the contents of text-like fields
pub const INPUT_PREVIEW_MAX: usize = 30;

/// Maximum length for label, button and link text
pub const TEXT_PREVIEW_MAX: usize = 80;

const TEXT_LIKE_TYPES: &[&str] = &["text", "email", "search", "url"];

/// How an element's content may be previewed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewClass {
    /// Never previewed
    Password,
    /// Field value, first 30 characters
    TextLike,
    /// Visible text of buttons, links and submit controls, first 80 characters
    Actionable,
    /// No preview
    Other,
}

impl PreviewClass {
    pub fn of(element: &ElementSnapshot) -> Self {
        let tag = element.tag();
        let kind = element.kind();

        if kind == "password" {
            PreviewClass::Password
        } else if TEXT_LIKE_TYPES.contains(&kind.as_str()) || tag == "textarea" {
            PreviewClass::TextLike
        } else if tag == "button" || tag == "a" || kind == "submit" {
            PreviewClass::Actionable
        } else {
            PreviewClass::Other
        }
    }
}

/// First `max` characters of `s`
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Truncated copy of `s`, or `None` when `s` is empty
fn preview(s: Option<&str>, max: usize) -> Option<String> {
    match s {
        Some(s) if !s.is_empty() => Some(truncate(s, max).to_string()),
        _ => None,
    }
}

/// Sanitized content preview for an event target
pub fn value_preview(target: Option<&ElementSnapshot>) -> Option<String> {
    let target = target?;
    match PreviewClass::of(target) {
        PreviewClass::Password | PreviewClass::Other => None,
        PreviewClass::TextLike => preview(target.value.as_deref(), INPUT_PREVIEW_MAX),
        PreviewClass::Actionable => preview(target.text.as_deref(), TEXT_PREVIEW_MAX),
    }
}

/// Label text cut to [`TEXT_PREVIEW_MAX`]
pub fn label_text(text: &str) -> Option<String> {
    preview(Some(text), TEXT_PREVIEW_MAX)
}
