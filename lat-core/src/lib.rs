//! lat-core: shared building blocks for the local activity tracker
//!
//! The tracker is split into two agents that talk over a browser-internal
//! message channel:
//!
//! - **Capture agent** (`lat-capture`) reduces DOM events inside a page to an
//!   [`InteractionRecord`] and hands it off via a [`RuntimeMessenger`].
//! - **Relay agent** (`lat-relay`) wraps records and tab lifecycle signals in a
//!   [`DeliveryEnvelope`] and POSTs them to the collector via a [`Collector`].
//!
//! This crate owns the types both sides agree on, plus the narrow platform
//! interface each host environment implements.
//!
//! ```text
//! DOM event ─► capture ─► RuntimeMessage ─► relay ─► DeliveryEnvelope ─► HTTP POST
//!                                            ▲
//!                         tab activated / page loaded
//! ```

pub mod clock;
pub mod envelope;
pub mod error;
pub mod message;
pub mod platform;
pub mod record;
pub mod tab;

pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::{DeliveryEnvelope, EnvelopePayload, SOURCE_BROWSER, kinds};
pub use error::{CaptureError, DeliveryError, LatError, PlatformError};
pub use message::{BROWSER_EVENT, MessageAck, MessageSender, RuntimeMessage, SenderTab};
pub use platform::{
    ChannelMessenger, Collector, HostKind, PortMessage, RuntimeMessenger, TabsApi, channel,
};
pub use record::{ClipboardOperation, EventDetail, EventType, InteractionRecord, ScrollMetrics};
pub use tab::{ActiveInfo, Tab, TabChangeInfo, TabId, TabStatus, WindowId};
