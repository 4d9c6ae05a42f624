//! Collector delivery
//!
//! Every envelope is one JSON POST. Delivery is fire-and-forget: the
//! [`Dispatcher`] spawns the request and returns at once, and a failed
//! request is logged and the envelope is gone. There is no retry, queue or
//! backoff.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lat_core::{Collector, DeliveryEnvelope, DeliveryError};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{trace, warn};
use url::Url;

use crate::config::CollectorConfig;

/// [`Collector`] that POSTs to an HTTP endpoint
pub struct HttpCollector {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpCollector {
    pub fn new(config: &CollectorConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn post(&self, envelope: &DeliveryEnvelope) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(envelope)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(self.timeout)
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Hands envelopes to a collector without waiting for the outcome
#[derive(Clone)]
pub struct Dispatcher {
    collector: Arc<dyn Collector>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(collector: Arc<dyn Collector>) -> Self {
        Self {
            collector,
            tracker: TaskTracker::new(),
        }
    }

    /// Start delivering an envelope and return immediately
    ///
    /// The handle is only useful to tests; dropping it does not cancel the
    /// request.
    pub fn dispatch(&self, envelope: DeliveryEnvelope) -> JoinHandle<()> {
        let collector = Arc::clone(&self.collector);
        self.tracker.spawn(async move {
            match collector.post(&envelope).await {
                Ok(()) => trace!(kind = %envelope.kind, "Envelope delivered"),
                Err(e) => warn!(kind = %envelope.kind, error = %e, "sendBrowserEvent failed"),
            }
        })
    }

    /// Wait for every delivery dispatched so far to finish
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// In-memory [`Collector`] for tests and dry runs
///
/// Keeps every delivered envelope. Can be switched into a failing mode to
/// stand in for an unreachable collector.
#[derive(Default)]
pub struct MemoryCollector {
    envelopes: Mutex<Vec<DeliveryEnvelope>>,
    attempts: AtomicUsize,
    unreachable: AtomicBool,
    notify: Notify,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent posts fail (or succeed again)
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Envelopes delivered so far
    pub fn envelopes(&self) -> Vec<DeliveryEnvelope> {
        self.envelopes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Delivery attempts so far, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` attempts were made, or `timeout` passes
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.attempts() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.attempts() >= count;
            }
        }
    }
}

#[async_trait]
impl Collector for MemoryCollector {
    async fn post(&self, envelope: &DeliveryEnvelope) -> Result<(), DeliveryError> {
        let result = if self.unreachable.load(Ordering::SeqCst) {
            Err(DeliveryError::Transport("error sending request: connection refused".into()))
        } else {
            self.envelopes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(envelope.clone());
            Ok(())
        };
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        result
    }
}
