//! DOM model seen by the capture agent

use std::collections::HashMap;

use lat_core::{EventType, PlatformError, ScrollMetrics};
use serde::{Deserialize, Serialize};

/// The properties of an event target the capture agent reads
///
/// Field names follow the DOM: `tag_name` is upper-case for HTML elements,
/// `input_type` is the element's `type` property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag_name: String,
    #[serde(default, rename = "type")]
    pub input_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// `innerText`, falling back to `textContent`
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
}

impl ElementSnapshot {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    /// Lower-cased tag name
    pub fn tag(&self) -> String {
        self.tag_name.to_lowercase()
    }

    /// Lower-cased `type` property, empty when unset
    pub fn kind(&self) -> String {
        self.input_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// A raw DOM event as delivered to a capture listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    /// `None` when the target is the document itself
    #[serde(default)]
    pub target: Option<ElementSnapshot>,
}

impl DomEvent {
    pub fn new(kind: EventType, target: ElementSnapshot) -> Self {
        Self {
            kind,
            target: Some(target),
        }
    }

    /// An event targeting the document rather than an element
    pub fn document(kind: EventType) -> Self {
        Self { kind, target: None }
    }
}

/// Document-level state the capture agent reads while building a record
pub trait Page: Send {
    fn url(&self) -> String;

    fn title(&self) -> String;

    /// Text of `label[for="<id>"]`, if one exists
    fn label_for(&self, id: &str) -> Result<Option<String>, PlatformError>;

    /// `document.visibilityState`
    fn visibility_state(&self) -> String;

    fn scroll_metrics(&self) -> ScrollMetrics;

    /// `document.scrollingElement`, or the root element
    fn scrolling_element(&self) -> Option<ElementSnapshot>;
}

/// A page described by plain data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Label text keyed by the `for` attribute
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_scroll")]
    pub scroll: ScrollMetrics,
}

fn default_visibility() -> String {
    "visible".to_string()
}

fn default_scroll() -> ScrollMetrics {
    ScrollMetrics {
        scroll_x: 0.0,
        scroll_y: 0.0,
        viewport_width: 0,
        viewport_height: 0,
        document_height: None,
    }
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            labels: HashMap::new(),
            visibility: default_visibility(),
            scroll: default_scroll(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, for_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.labels.insert(for_id.into(), text.into());
        self
    }
}

impl Page for PageSnapshot {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn label_for(&self, id: &str) -> Result<Option<String>, PlatformError> {
        // Same ids querySelector rejects in an attribute selector
        if id.contains('"') || id.contains('\\') {
            return Err(PlatformError::Dom(format!(
                "invalid selector: label[for=\"{id}\"]"
            )));
        }
        Ok(self.labels.get(id).cloned())
    }

    fn visibility_state(&self) -> String {
        self.visibility.clone()
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.scroll
    }

    fn scrolling_element(&self) -> Option<ElementSnapshot> {
        Some(ElementSnapshot::new("HTML"))
    }
}
