use std::time::Duration;

use lat_core::HostKind;
use lat_relay::{CollectorConfig, RelayConfig};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLatConfig {
    #[serde(default)]
    pub collector: RawCollectorConfig,

    #[serde(default)]
    pub relay: RawRelayConfig,
}

/// Collector section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCollectorConfig {
    /// Collector URL; validated when the config is finalized
    pub endpoint: Option<String>,

    /// Per-request timeout, e.g. "5s"
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Relay section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRelayConfig {
    pub host: Option<HostKind>,

    pub source: Option<String>,

    #[serde(default, with = "humantime_serde")]
    pub heartbeat_interval: Option<Duration>,

    pub privileged_prefixes: Option<Vec<String>>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LatConfig {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}
