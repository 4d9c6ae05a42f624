//! Platform abstraction
//!
//! The capture and relay agents only ever talk to the browser through the
//! traits in this module. Each host environment (an in-process channel, the
//! native-messaging stdio bridge, test fakes) provides its own
//! implementation and is selected at startup.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::envelope::DeliveryEnvelope;
use crate::error::{DeliveryError, PlatformError};
use crate::message::{MessageSender, RuntimeMessage};
use crate::tab::{Tab, TabId, WindowId};

/// One-shot message send from a page to the relay
///
/// Implementations must not block on the relay's acknowledgment.
pub trait RuntimeMessenger: Send + Sync {
    fn send_message(&self, message: RuntimeMessage) -> Result<(), PlatformError>;
}

/// Tab lookup
#[async_trait]
pub trait TabsApi: Send + Sync {
    async fn get(&self, tab_id: TabId) -> Result<Tab, PlatformError>;
}

/// Outbound transport to the collector
#[async_trait]
pub trait Collector: Send + Sync {
    /// POST a single envelope
    async fn post(&self, envelope: &DeliveryEnvelope) -> Result<(), DeliveryError>;
}

/// Browser family the extension runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    #[default]
    Chromium,
    Firefox,
}

impl HostKind {
    /// URL prefixes of browser-internal pages that are never tracked
    pub fn default_privileged_prefixes(&self) -> &'static [&'static str] {
        match self {
            HostKind::Chromium => &["chrome://", "chrome-extension://", "edge://", "devtools://"],
            HostKind::Firefox => &["about:", "moz-extension://", "resource://", "chrome://"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Chromium => "chromium",
            HostKind::Firefox => "firefox",
        }
    }
}

impl std::fmt::Display for HostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" | "edge" => Ok(HostKind::Chromium),
            "firefox" | "gecko" => Ok(HostKind::Firefox),
            other => Err(format!("unknown host kind: {other}")),
        }
    }
}

/// A runtime message in flight on an in-process channel
#[derive(Debug, Clone)]
pub struct PortMessage {
    pub message: RuntimeMessage,
    pub sender: MessageSender,
}

/// In-process [`RuntimeMessenger`] bound to one tab
///
/// Plays the role of the browser's runtime channel when capture and relay
/// share a process: every message is stamped with the tab this messenger
/// was created for, the way the browser fills in `sender.tab`.
#[derive(Debug, Clone)]
pub struct ChannelMessenger {
    tx: mpsc::UnboundedSender<PortMessage>,
    sender: MessageSender,
}

impl ChannelMessenger {
    /// Messenger for another tab on the same channel
    pub fn for_tab(&self, tab_id: TabId, window_id: WindowId) -> Self {
        Self {
            tx: self.tx.clone(),
            sender: MessageSender::from_tab(tab_id, window_id),
        }
    }

    pub fn sender(&self) -> MessageSender {
        self.sender
    }
}

impl RuntimeMessenger for ChannelMessenger {
    fn send_message(&self, message: RuntimeMessage) -> Result<(), PlatformError> {
        self.tx
            .send(PortMessage {
                message,
                sender: self.sender,
            })
            .map_err(|_| PlatformError::NoReceiver)
    }
}

/// Create an in-process runtime channel
///
/// The returned messenger carries no tab identity; use
/// [`ChannelMessenger::for_tab`] to bind one per page.
pub fn channel() -> (ChannelMessenger, mpsc::UnboundedReceiver<PortMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelMessenger {
            tx,
            sender: MessageSender::default(),
        },
        rx,
    )
}
