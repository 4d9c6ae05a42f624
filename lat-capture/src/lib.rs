//! lat-capture: the page-side capture agent
//!
//! One [`CaptureAgent`] lives in each page. It receives raw DOM events,
//! reduces each to an [`InteractionRecord`](lat_core::InteractionRecord),
//! and hands it to the relay through a
//! [`RuntimeMessenger`](lat_core::RuntimeMessenger) without waiting for an
//! answer.
//!
//! - [`sanitize`] - value/label previews and the password rule
//! - [`ScrollGate`] - at most one scroll record per second
//! - [`Page`] / [`PageSnapshot`] - what the agent reads from the document

mod agent;
mod dom;
pub mod sanitize;
mod throttle;

pub use agent::{CaptureAgent, Handoff};
pub use dom::{DomEvent, ElementSnapshot, Page, PageSnapshot};
pub use throttle::{SCROLL_INTERVAL, ScrollGate};
