use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use lat_relay::{CollectorConfig, DEFAULT_ENDPOINT, RelayConfig};
use url::Url;

use super::types::{LatConfig, RawCollectorConfig, RawLatConfig, RawRelayConfig};

/// Overrides the directory holding the project config file
pub const PROJECT_CONFIG_DIR_ENV: &str = "LAT_PROJECT_CONFIG_DIR";

/// Overrides the collector endpoint from every config file
pub const COLLECTOR_URL_ENV: &str = "LAT_COLLECTOR_URL";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project + environment)
    pub fn load() -> Result<LatConfig> {
        let mut layers = Vec::new();
        if let Some(user_path) = Self::user_config_path() {
            layers.push(user_path);
        }
        layers.push(Self::project_config_path());

        Self::load_layers(&layers)
    }

    /// Load and merge the given files in order, then apply the environment
    ///
    /// Missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<LatConfig> {
        let mut raw = RawLatConfig::default();

        for path in paths {
            if path.exists() {
                raw = Self::merge_raw(raw, Self::read_raw(path)?);
            }
        }

        if let Ok(endpoint) = std::env::var(COLLECTOR_URL_ENV)
            && !endpoint.is_empty()
        {
            raw.collector.endpoint = Some(endpoint);
        }

        Self::finalize(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lat").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with LAT_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".lat/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawLatConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawLatConfig, overlay: RawLatConfig) -> RawLatConfig {
        RawLatConfig {
            collector: RawCollectorConfig {
                endpoint: overlay.collector.endpoint.or(base.collector.endpoint),
                timeout: overlay.collector.timeout.or(base.collector.timeout),
            },
            relay: RawRelayConfig {
                host: overlay.relay.host.or(base.relay.host),
                source: overlay.relay.source.or(base.relay.source),
                heartbeat_interval: overlay
                    .relay
                    .heartbeat_interval
                    .or(base.relay.heartbeat_interval),
                privileged_prefixes: overlay
                    .relay
                    .privileged_prefixes
                    .or(base.relay.privileged_prefixes),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawLatConfig) -> Result<LatConfig> {
        let collector_defaults = CollectorConfig::default();
        let relay_defaults = RelayConfig::default();

        let endpoint = validate_endpoint(raw.collector.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        let heartbeat_interval = raw
            .relay
            .heartbeat_interval
            .unwrap_or(relay_defaults.heartbeat_interval);
        if heartbeat_interval.is_zero() {
            bail!("relay.heartbeat_interval must be greater than zero");
        }

        Ok(LatConfig {
            collector: CollectorConfig {
                endpoint,
                timeout: raw.collector.timeout.unwrap_or(collector_defaults.timeout),
            },
            relay: RelayConfig {
                host: raw.relay.host.unwrap_or(relay_defaults.host),
                source: raw.relay.source.unwrap_or(relay_defaults.source),
                heartbeat_interval,
                privileged_prefixes: raw.relay.privileged_prefixes,
            },
        })
    }
}

/// Parse a collector endpoint, accepting only absolute http(s) URLs
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).with_context(|| format!("invalid collector endpoint {endpoint:?}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("collector endpoint must use http or https, got {other:?}"),
    }
}
