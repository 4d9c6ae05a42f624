//! In-process host
//!
//! Capture agents and the relay agent share one process and talk over
//! [`lat_core::channel`]. Used by `lat replay` and the end-to-end tests.

use std::sync::Arc;

use lat_core::PortMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::RelayAgent;

/// Feed runtime messages from an in-process channel to the relay agent
///
/// Runs until every [`ChannelMessenger`](lat_core::ChannelMessenger) is
/// dropped or `shutdown` fires. Returns the number of messages handled.
pub async fn serve_channel(
    agent: Arc<RelayAgent>,
    mut rx: mpsc::UnboundedReceiver<PortMessage>,
    shutdown: CancellationToken,
) -> usize {
    info!("Runtime channel open");
    let mut handled = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Runtime channel received shutdown signal");
                break;
            }
            msg = rx.recv() => {
                let Some(PortMessage { message, sender }) = msg else {
                    info!("All capture agents disconnected");
                    break;
                };
                handled += 1;
                match agent.on_message(&message, sender) {
                    Some(ack) => debug!(ok = ack.ok, tab_id = ?sender.tab_id(), "Message acknowledged"),
                    None => debug!(kind = ?message.kind, "Ignoring unrelated message"),
                }
            }
        }
    }

    handled
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lat_core::{RuntimeMessage, RuntimeMessenger, channel};
    use serde_json::json;

    use super::*;
    use crate::config::RelayConfig;
    use crate::delivery::MemoryCollector;
    use crate::tabs::TabCache;

    #[tokio::test]
    async fn test_serve_channel_until_senders_drop() {
        let collector = Arc::new(MemoryCollector::new());
        let agent = Arc::new(RelayAgent::new(
            &RelayConfig::default(),
            collector.clone(),
            Arc::new(TabCache::new()),
        ));
        let (messenger, rx) = channel();
        let tab = messenger.for_tab(11, 4);
        drop(messenger);

        tab.send_message(RuntimeMessage {
            kind: Some("browser-event".to_string()),
            payload: json!({"event_type": "submit"}),
        })
        .unwrap();
        tab.send_message(RuntimeMessage {
            kind: Some("ping".to_string()),
            payload: json!({}),
        })
        .unwrap();
        drop(tab);

        let handled = serve_channel(agent, rx, CancellationToken::new()).await;
        assert_eq!(handled, 2);

        assert!(collector.wait_for_attempts(1, Duration::from_secs(1)).await);
        let envelopes = collector.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].kind, "submit");
        assert_eq!(envelopes[0].payload.tab_id, Some(11));
        assert_eq!(envelopes[0].payload.window_id, Some(4));
    }

    #[tokio::test]
    async fn test_serve_channel_stops_on_shutdown() {
        let agent = Arc::new(RelayAgent::new(
            &RelayConfig::default(),
            Arc::new(MemoryCollector::new()),
            Arc::new(TabCache::new()),
        ));
        let (_messenger, rx) = channel();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert_eq!(serve_channel(agent, rx, shutdown).await, 0);
    }
}
