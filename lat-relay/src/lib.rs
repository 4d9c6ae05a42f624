//! lat-relay: the background relay agent
//!
//! Receives interaction records from capture agents, watches tab lifecycle
//! notifications, emits a periodic heartbeat, and POSTs each resulting
//! [`DeliveryEnvelope`](lat_core::DeliveryEnvelope) to the collector.
//!
//! Host environments:
//!
//! - [`serve_channel`] - capture and relay in one process
//! - [`NativeHost`] - relay behind a browser native-messaging port

mod agent;
mod config;
mod delivery;
mod filter;
mod local;
pub mod native;
mod tabs;

pub use agent::RelayAgent;
pub use config::{CollectorConfig, DEFAULT_ENDPOINT, RelayConfig};
pub use delivery::{Dispatcher, HttpCollector, MemoryCollector};
pub use filter::UrlFilter;
pub use local::serve_channel;
pub use native::{HostEvent, HostReply, NativeHost};
pub use tabs::TabCache;
