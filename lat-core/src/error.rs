//! Error types for lat-core
//!
//! None of these are fatal. Every boundary that can produce one logs it and
//! drops the event in question.

use thiserror::Error;

use crate::tab::TabId;

/// Top-level error type for the tracker
#[derive(Error, Debug)]
pub enum LatError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Errors while building or handing off an interaction record
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to send record: {0}")]
    Messaging(#[from] PlatformError),
}

/// Errors raised by a host environment (messaging, tabs, stdio)
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,

    #[error("No tab with id: {0}")]
    TabNotFound(TabId),

    #[error("DOM access failed: {0}")]
    Dom(String),

    #[error("Host protocol error: {0}")]
    Protocol(String),

    #[error("Host I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while delivering an envelope to the collector
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Collector request failed: {0}")]
    Transport(String),

    #[error("Collector did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Collector rejected envelope with status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn platform_error_no_receiver_displays_correctly() {
        let error = PlatformError::NoReceiver;
        assert!(error.to_string().contains("Receiving end does not exist"));
    }

    #[test]
    fn platform_error_tab_not_found_includes_id() {
        let error = PlatformError::TabNotFound(42);
        assert!(error.to_string().contains("42"));
    }

    #[test]
    fn delivery_error_status_displays_code() {
        let error = DeliveryError::Status(503);
        assert!(error.to_string().contains("503"));
    }

    #[test]
    fn delivery_error_timeout_displays_duration() {
        let error = DeliveryError::Timeout(Duration::from_secs(5));
        assert!(error.to_string().contains("5s"));
    }

    #[test]
    fn capture_error_converts_from_platform_error() {
        let capture: CaptureError = PlatformError::NoReceiver.into();
        assert!(matches!(
            capture,
            CaptureError::Messaging(PlatformError::NoReceiver)
        ));
    }

    #[test]
    fn lat_error_converts_from_each_kind() {
        let e: LatError = PlatformError::NoReceiver.into();
        assert!(matches!(e, LatError::Platform(_)));

        let e: LatError = DeliveryError::Status(500).into();
        assert!(matches!(e, LatError::Delivery(_)));
        assert!(e.to_string().contains("Delivery error"));

        let e: LatError = CaptureError::Messaging(PlatformError::NoReceiver).into();
        assert!(matches!(e, LatError::Capture(_)));
    }
}
