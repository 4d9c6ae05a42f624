//! Configuration for the relay agent and its collector.

use std::time::Duration;

use lat_core::{HostKind, SOURCE_BROWSER};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/events";

/// Where and how envelopes are delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Collector URL every envelope is POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: default_timeout(),
        }
    }
}

impl CollectorConfig {
    /// Create a new config with a custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Create a new config with a custom timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Behaviour of the relay agent itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Browser family; picks the default privileged URL prefixes.
    #[serde(default)]
    pub host: HostKind,

    /// `source` tag written into every envelope.
    #[serde(default = "default_source")]
    pub source: String,

    /// Interval between liveness envelopes.
    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub heartbeat_interval: Duration,

    /// Overrides the host's privileged URL prefixes when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged_prefixes: Option<Vec<String>>,
}

fn default_source() -> String {
    SOURCE_BROWSER.to_string()
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(30)
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: HostKind::default(),
            source: default_source(),
            heartbeat_interval: default_heartbeat_interval(),
            privileged_prefixes: None,
        }
    }
}

impl RelayConfig {
    /// Create a new config for a different browser family.
    #[must_use]
    pub fn with_host(mut self, host: HostKind) -> Self {
        self.host = host;
        self
    }

    /// Create a new config with a custom heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Prefixes of URLs that are never tracked.
    pub fn privileged_prefixes(&self) -> Vec<String> {
        match &self.privileged_prefixes {
            Some(prefixes) => prefixes.clone(),
            None => self
                .host
                .default_privileged_prefixes()
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}
