//! Messages exchanged between capture and relay agents

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::InteractionRecord;
use crate::tab::{TabId, WindowId};

/// Tag carried by interaction messages from a capture agent
pub const BROWSER_EVENT: &str = "browser-event";

/// A message on the extension runtime channel
///
/// Other parts of an extension may share the channel, so `type` is optional
/// and `payload` is kept untyped until the relay has matched the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl RuntimeMessage {
    /// Wrap an interaction record for the relay
    pub fn browser_event(record: &InteractionRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: Some(BROWSER_EVENT.to_string()),
            payload: serde_json::to_value(record)?,
        })
    }

    pub fn is_browser_event(&self) -> bool {
        self.kind.as_deref() == Some(BROWSER_EVENT)
    }
}

/// Tab that sent a runtime message, stamped by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderTab {
    pub id: TabId,
    pub window_id: WindowId,
}

/// Sender metadata attached to a runtime message by the browser
///
/// This is the only trusted source of tab identity; the payload is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    #[serde(default)]
    pub tab: Option<SenderTab>,
}

impl MessageSender {
    pub fn from_tab(id: TabId, window_id: WindowId) -> Self {
        Self {
            tab: Some(SenderTab { id, window_id }),
        }
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.tab.map(|t| t.id)
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.tab.map(|t| t.window_id)
    }
}

/// Acknowledgment returned to the sender of a runtime message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageAck {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
