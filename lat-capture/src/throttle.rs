//! Scroll rate limiting

use std::time::Duration;

/// Minimum spacing between two forwarded scroll records
pub const SCROLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Lets one notification through per interval and drops the rest
///
/// Dropped notifications are not queued. Time is supplied by the caller as
/// a monotonic offset, so the gate itself never reads a clock.
#[derive(Debug, Clone)]
pub struct ScrollGate {
    interval: Duration,
    last_sent: Option<Duration>,
}

impl ScrollGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Returns true and records `now` if the interval has elapsed
    pub fn try_pass(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_sent
            && now.saturating_sub(last) < self.interval
        {
            return false;
        }
        self.last_sent = Some(now);
        true
    }
}

impl Default for ScrollGate {
    fn default() -> Self {
        Self::new(SCROLL_INTERVAL)
    }
}
