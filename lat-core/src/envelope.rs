//! Delivery envelopes sent to the collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tab::{Tab, TabId, WindowId};

/// Default `source` tag for envelopes
pub const SOURCE_BROWSER: &str = "browser";

/// Envelope `type` values not taken from an interaction record
pub mod kinds {
    pub const TAB_ACTIVATED: &str = "tab_activated";
    pub const PAGE_LOADED: &str = "page_loaded";
    pub const HEARTBEAT: &str = "browser_heartbeat";
    /// Used when a forwarded record carries no `event_type`
    pub const DOM_EVENT: &str = "browser_dom_event";
}

/// Location and origin of an envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePayload {
    pub url: Option<String>,
    pub title: Option<String>,
    pub tab_id: Option<TabId>,
    pub window_id: Option<WindowId>,
    /// The forwarded interaction record, verbatim
    pub dom_event: Option<Value>,
}

impl EnvelopePayload {
    /// Payload for a tab lifecycle envelope
    ///
    /// An empty URL or title is sent as null.
    pub fn from_tab(tab: &Tab) -> Self {
        Self {
            url: non_empty(tab.url.as_deref()),
            title: non_empty(tab.title.as_deref()),
            tab_id: Some(tab.id),
            window_id: Some(tab.window_id),
            dom_event: None,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Wire-format wrapper POSTed to the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEnvelope {
    /// Send time, distinct from a record's capture time
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: EnvelopePayload,
}

impl DeliveryEnvelope {
    pub fn new(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        kind: impl Into<String>,
        payload: EnvelopePayload,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            kind: kind.into(),
            payload,
        }
    }

    /// Whether this is a liveness envelope
    pub fn is_heartbeat(&self) -> bool {
        self.kind == kinds::HEARTBEAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = DeliveryEnvelope::new(
            Utc::now(),
            SOURCE_BROWSER,
            kinds::HEARTBEAT,
            EnvelopePayload::default(),
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["source"], "browser");
        assert_eq!(json["type"], "browser_heartbeat");
        let payload = json["payload"].as_object().unwrap();
        for key in ["url", "title", "tab_id", "window_id", "dom_event"] {
            assert!(payload[key].is_null(), "{key} should be null");
        }
        assert!(envelope.is_heartbeat());
    }

    #[test]
    fn test_payload_from_tab() {
        let tab = Tab {
            id: 7,
            window_id: 2,
            url: Some("https://example.com/".to_string()),
            title: Some("Example".to_string()),
            status: None,
        };
        let payload = EnvelopePayload::from_tab(&tab);

        assert_eq!(payload.tab_id, Some(7));
        assert_eq!(payload.window_id, Some(2));
        assert_eq!(payload.title.as_deref(), Some("Example"));
        assert!(payload.dom_event.is_none());
    }

    #[test]
    fn test_payload_from_tab_with_blank_title() {
        let tab = Tab {
            id: 3,
            window_id: 1,
            url: Some("https://example.com/blank".to_string()),
            title: Some(String::new()),
            status: None,
        };
        let json = serde_json::to_value(EnvelopePayload::from_tab(&tab)).unwrap();

        assert_eq!(json["url"], "https://example.com/blank");
        assert!(json["title"].is_null());
    }
}
