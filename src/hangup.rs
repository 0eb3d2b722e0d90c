//! Deferred auto-hangup once the agent asks to end the call.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// Where the controller is in its one-way lifecycle.
///
/// `Idle → Armed → Fired`, or `Armed → Cancelled` when the session is torn down first.
/// Neither terminal state ever leads back to `Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangupState {
    Idle,
    Armed { fire_at: Instant },
    Fired,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct HangupController {
    delay: Duration,
    state: HangupState,
}

impl HangupController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: HangupState::Idle,
        }
    }

    pub fn state(&self) -> HangupState {
        self.state
    }

    /// Arm the timer. Only the first call from `Idle` has any effect.
    pub fn arm(&mut self, now: Instant) -> bool {
        match self.state {
            HangupState::Idle => {
                let fire_at = now + self.delay;
                self.state = HangupState::Armed { fire_at };
                info!(delay_ms = self.delay.as_millis() as u64, "auto-hangup armed");
                true
            }
            _ => {
                debug!(state = ?self.state, "auto-hangup already armed or finished");
                false
            }
        }
    }

    /// When the armed timer is due, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            HangupState::Armed { fire_at } => Some(fire_at),
            _ => None,
        }
    }

    /// Transition `Armed → Fired` once the deadline has passed. Returns whether it fired.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            HangupState::Armed { fire_at } if now >= fire_at => {
                self.state = HangupState::Fired;
                info!("auto-hangup fired");
                true
            }
            _ => false,
        }
    }

    /// Drop any pending timer for good. Called on teardown.
    pub fn cancel(&mut self) {
        match self.state {
            HangupState::Armed { .. } => {
                info!("auto-hangup cancelled");
                self.state = HangupState::Cancelled;
            }
            HangupState::Idle => self.state = HangupState::Cancelled,
            HangupState::Fired | HangupState::Cancelled => {}
        }
    }
}
