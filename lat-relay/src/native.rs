//! Native-messaging host
//!
//! Lets the relay agent run as a native application the browser extension
//! connects to with `runtime.connectNative`. The browser speaks the
//! native-messaging protocol over stdio: every message is a 32-bit length in
//! native byte order followed by that many bytes of UTF-8 JSON.
//!
//! The extension's background script forwards what it observes as
//! [`HostEvent`] frames and receives [`HostReply`] frames for runtime
//! messages that asked for an acknowledgment.
//!
//! ```text
//! extension ──frame──► stdin ─► NativeHost ─► RelayAgent ─► collector
//! extension ◄─frame─── stdout ◄─ HostReply
//! ```

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use lat_core::{
    ActiveInfo, MessageAck, MessageSender, PlatformError, RuntimeMessage, Tab, TabChangeInfo,
    TabId, WindowId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::RelayAgent;
use crate::tabs::TabCache;

/// Largest frame the browser may send to a native host
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Largest frame a native host may send to the browser
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Length-prefixed framing used by native messaging
pub fn codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .native_endian()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// A notification forwarded by the extension's background script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// A runtime message from a content script, with its sender
    RuntimeMessage {
        /// Set when the extension wants an acknowledgment back
        #[serde(default)]
        id: Option<u64>,
        message: Value,
        #[serde(default)]
        sender: MessageSender,
    },
    /// `tabs.onActivated`, optionally carrying the tab it resolved to
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        tab: Option<Tab>,
    },
    /// `tabs.onUpdated`
    TabUpdated {
        #[serde(default)]
        change_info: TabChangeInfo,
        tab: Tab,
    },
    /// `tabs.onRemoved`
    TabRemoved { tab_id: TabId },
}

/// Acknowledgment for a [`HostEvent::RuntimeMessage`] that carried an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReply {
    pub reply_to: u64,
    pub response: MessageAck,
}

/// Runs the relay agent behind a native-messaging port
pub struct NativeHost {
    agent: Arc<RelayAgent>,
    tabs: Arc<TabCache>,
}

impl NativeHost {
    /// `tabs` must be the same cache the agent looks tabs up in
    pub fn new(agent: Arc<RelayAgent>, tabs: Arc<TabCache>) -> Self {
        Self { agent, tabs }
    }

    /// Apply one host event, returning the reply to send, if any
    pub async fn handle_event(&self, event: HostEvent) -> Option<HostReply> {
        match event {
            HostEvent::RuntimeMessage {
                id,
                message,
                sender,
            } => {
                let message: RuntimeMessage = match serde_json::from_value(message) {
                    Ok(message) => message,
                    Err(e) => {
                        debug!(error = %e, "Ignoring non-object runtime message");
                        return None;
                    }
                };
                let ack = self.agent.on_message(&message, sender)?;
                id.map(|reply_to| HostReply {
                    reply_to,
                    response: ack,
                })
            }
            HostEvent::TabActivated {
                tab_id,
                window_id,
                tab,
            } => {
                if let Some(tab) = tab {
                    self.tabs.upsert(tab);
                }
                self.agent
                    .on_tab_activated(ActiveInfo { tab_id, window_id })
                    .await;
                None
            }
            HostEvent::TabUpdated { change_info, tab } => {
                self.tabs.upsert(tab.clone());
                self.agent.on_tab_updated(&change_info, &tab);
                None
            }
            HostEvent::TabRemoved { tab_id } => {
                self.tabs.remove(tab_id);
                None
            }
        }
    }

    /// Serve frames from `reader` until EOF or `shutdown`
    ///
    /// Malformed JSON frames are logged and skipped. Framing errors end the
    /// session, since the stream cannot be resynchronized. Returns the
    /// number of frames read.
    pub async fn run<R, W>(
        &self,
        reader: R,
        writer: W,
        shutdown: CancellationToken,
    ) -> Result<usize, PlatformError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, codec(MAX_INBOUND_FRAME));
        let mut replies = FramedWrite::new(writer, codec(MAX_OUTBOUND_FRAME));
        let mut handled = 0;

        info!("Native messaging host started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Native messaging host received shutdown signal");
                    break;
                }
                frame = frames.next() => {
                    let Some(frame) = frame else {
                        info!("Browser closed the native messaging port");
                        break;
                    };
                    let frame = frame?;
                    handled += 1;

                    let event = match serde_json::from_slice::<HostEvent>(&frame) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(error = %e, size = frame.len(), "Malformed host frame");
                            continue;
                        }
                    };

                    if let Some(reply) = self.handle_event(event).await {
                        let bytes = serde_json::to_vec(&reply)
                            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
                        replies.send(Bytes::from(bytes)).await?;
                    }
                }
            }
        }

        Ok(handled)
    }
}
