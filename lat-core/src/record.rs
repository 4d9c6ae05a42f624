//! Interaction records produced by the capture agent
//!
//! One record per DOM event. Records are flat JSON objects: the
//! event-specific [`EventDetail`] fields are merged into the top level
//! next to the element fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of DOM interaction that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    Input,
    Submit,
    Change,
    Focus,
    Blur,
    Copy,
    Paste,
    Cut,
    Scroll,
    #[serde(rename = "visibilitychange")]
    VisibilityChange,
    #[serde(rename = "before_unload")]
    BeforeUnload,
}

impl EventType {
    /// Get the event type as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::Input => "input",
            EventType::Submit => "submit",
            EventType::Change => "change",
            EventType::Focus => "focus",
            EventType::Blur => "blur",
            EventType::Copy => "copy",
            EventType::Paste => "paste",
            EventType::Cut => "cut",
            EventType::Scroll => "scroll",
            EventType::VisibilityChange => "visibilitychange",
            EventType::BeforeUnload => "before_unload",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which clipboard operation fired. Clipboard contents are never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardOperation {
    Copy,
    Paste,
    Cut,
}

impl ClipboardOperation {
    pub fn event_type(&self) -> EventType {
        match self {
            ClipboardOperation::Copy => EventType::Copy,
            ClipboardOperation::Paste => EventType::Paste,
            ClipboardOperation::Cut => EventType::Cut,
        }
    }
}

/// Window and document geometry at the time of a scroll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub document_height: Option<u32>,
}

/// Event-specific auxiliary fields
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    None,
    Change {
        change_kind: Option<String>,
        checked: Option<bool>,
    },
    Clipboard(ClipboardOperation),
    Scroll(ScrollMetrics),
    Visibility(String),
}

impl EventDetail {
    /// Flatten into the key/value pairs merged into a record
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        match self {
            EventDetail::None => {}
            EventDetail::Change {
                change_kind,
                checked,
            } => {
                fields.insert("change_kind".into(), change_kind.into());
                fields.insert("checked".into(), checked.into());
            }
            EventDetail::Clipboard(op) => {
                fields.insert(
                    "clipboard_operation".into(),
                    Value::String(op.event_type().as_str().to_string()),
                );
            }
            EventDetail::Scroll(metrics) => {
                fields.insert("scroll_x".into(), metrics.scroll_x.into());
                fields.insert("scroll_y".into(), metrics.scroll_y.into());
                fields.insert("viewport_width".into(), metrics.viewport_width.into());
                fields.insert("viewport_height".into(), metrics.viewport_height.into());
                fields.insert("document_height".into(), metrics.document_height.into());
            }
            EventDetail::Visibility(state) => {
                fields.insert("visibility".into(), Value::String(state));
            }
        }
        fields
    }
}

/// A normalized, privacy-filtered record of one user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Document location at capture time
    pub url: String,
    /// Document title at capture time
    pub title: String,
    pub event_type: EventType,
    pub element_tag: Option<String>,
    pub element_type: Option<String>,
    pub element_id: Option<String>,
    pub element_name: Option<String>,
    /// Text of `label[for=<element_id>]`, at most 80 characters
    pub element_label: Option<String>,
    /// Sanitized content preview. Never set for password fields.
    pub value_preview: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InteractionRecord {
    /// Look up an event-specific field
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
