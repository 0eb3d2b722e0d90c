use std::time::Duration;

use tokio::time::Instant;

/// Monotonic-clock gate: lets one event through per `interval`, drops the rest.
///
/// This is deliberately not a queue. Callers that get `false` simply skip their work.
#[derive(Debug, Clone)]
pub struct RateGate {
    interval: Duration,
    last: Option<Instant>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an event at `now` would pass, without consuming the slot.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Pass an event at `now` if the window since the last passed event has elapsed.
    pub fn try_pass(&mut self, now: Instant) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.last = Some(now);
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
