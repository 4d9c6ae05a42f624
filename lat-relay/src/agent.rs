//! Relay agent - the background side of the tracker
//!
//! Owns the delivery path. Translates tab lifecycle notifications, runtime
//! messages from capture agents and its own heartbeat into
//! [`DeliveryEnvelope`]s.

use std::sync::Arc;
use std::time::Duration;

use lat_core::{
    ActiveInfo, Clock, Collector, DeliveryEnvelope, EnvelopePayload, MessageAck, MessageSender,
    RuntimeMessage, SystemClock, Tab, TabChangeInfo, TabsApi, kinds,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::delivery::Dispatcher;
use crate::filter::UrlFilter;

pub struct RelayAgent {
    tabs: Arc<dyn TabsApi>,
    dispatcher: Dispatcher,
    filter: UrlFilter,
    clock: Arc<dyn Clock>,
    source: String,
    heartbeat_interval: Duration,
}

impl RelayAgent {
    pub fn new(config: &RelayConfig, collector: Arc<dyn Collector>, tabs: Arc<dyn TabsApi>) -> Self {
        Self::with_clock(config, collector, tabs, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        config: &RelayConfig,
        collector: Arc<dyn Collector>,
        tabs: Arc<dyn TabsApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tabs,
            dispatcher: Dispatcher::new(collector),
            filter: UrlFilter::new(config.privileged_prefixes()),
            clock,
            source: config.source.clone(),
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// A tab became active. Returns whether an envelope was emitted.
    pub async fn on_tab_activated(&self, info: ActiveInfo) -> bool {
        let tab = match self.tabs.get(info.tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!(tab_id = info.tab_id, error = %e, "onActivated error");
                return false;
            }
        };

        if !self.filter.is_trackable(tab.url.as_deref()) {
            debug!(tab_id = tab.id, "Skipping activation of untracked tab");
            return false;
        }

        self.emit(kinds::TAB_ACTIVATED, EnvelopePayload::from_tab(&tab));
        true
    }

    /// A tab was updated. Emits `page_loaded` once loading completes.
    pub fn on_tab_updated(&self, change: &TabChangeInfo, tab: &Tab) -> bool {
        if !change.is_complete() {
            return false;
        }
        if !self.filter.is_trackable(tab.url.as_deref()) {
            debug!(tab_id = tab.id, "Skipping load of untracked tab");
            return false;
        }

        self.emit(kinds::PAGE_LOADED, EnvelopePayload::from_tab(tab));
        true
    }

    /// Handle a runtime message from a capture agent
    ///
    /// Returns `None` for messages that are not interaction events; those
    /// belong to someone else on the channel and get no reply. Tab identity
    /// is taken from `sender`, never from the payload.
    pub fn on_message(&self, message: &RuntimeMessage, sender: MessageSender) -> Option<MessageAck> {
        if !message.is_browser_event() {
            return None;
        }

        let record = match &message.payload {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                let error = format!("browser-event payload must be an object, got {}", kind_of(other));
                warn!(error = %error, "onMessage error");
                return Some(MessageAck::failed(error));
            }
        };

        let kind = record
            .get("event_type")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(kinds::DOM_EVENT)
            .to_string();

        let payload = EnvelopePayload {
            url: string_field(&record, "url"),
            title: string_field(&record, "title"),
            tab_id: sender.tab_id(),
            window_id: sender.window_id(),
            dom_event: Some(Value::Object(record)),
        };

        self.emit(kind, payload);
        Some(MessageAck::ok())
    }

    /// Emit one liveness envelope with every location field null
    pub fn emit_heartbeat(&self) {
        self.emit(kinds::HEARTBEAT, EnvelopePayload::default());
    }

    /// Emit a heartbeat every `heartbeat_interval` until `shutdown` fires
    ///
    /// The first heartbeat goes out one full interval after the call.
    pub fn spawn_heartbeat(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let agent = Arc::clone(self);
        let period = self.heartbeat_interval;

        tokio::spawn(async move {
            info!(interval = ?period, "Heartbeat started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Heartbeat stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        agent.emit_heartbeat();
                    }
                }
            }
        })
    }

    /// Wait for deliveries already handed to the collector
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    fn emit(&self, kind: impl Into<String>, payload: EnvelopePayload) {
        let envelope = DeliveryEnvelope::new(self.clock.now(), self.source.clone(), kind, payload);
        debug!(kind = %envelope.kind, tab_id = ?envelope.payload.tab_id, "Emitting envelope");
        self.dispatcher.dispatch(envelope);
    }
}

fn string_field(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
