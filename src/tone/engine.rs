use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::patterns::{PatternHits, PatternTracker};

use super::decision::{ToneDecision, ToneRequest};
use super::fast_path::apply_local_heuristic;
use super::rate::RateGate;
use super::state::ToneState;

/// What happened to a remote arbitration decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// Applied. `cut_now` is true only on the first accepted cut request of the session.
    Accepted { cut_now: bool },
    /// Arrived inside the window of the previously accepted decision.
    RateLimited,
    /// Did not materially change mood, time pressure or skepticism.
    Insignificant,
}

/// Owner of the session's [`ToneState`].
///
/// Two paths feed the state. The fast path (`on_agent_utterance`, `on_rep_utterance`) runs
/// synchronously on every inbound message. The slow path is split in two halves so that the
/// network call can happen elsewhere: `begin_arbitration` hands out a request when the rate
/// window allows it, and `apply_arbitration` folds the response back in.
///
/// Both halves are rate limited with the same interval. Dispatches are spaced by the interval,
/// and so are accepted decisions. An accepted decision is stamped with the dispatch instant of the
/// request it answers, so response latency never decides whether it lands inside the window.
#[derive(Debug)]
pub struct ToneEngine {
    state: ToneState,
    dispatch_gate: RateGate,
    accept_gate: RateGate,
    /// Dispatch instant of the outstanding request.
    in_flight: Option<Instant>,
    tracker: PatternTracker,
}

impl ToneEngine {
    pub fn new(min_update_interval: Duration, tracker: PatternTracker) -> Self {
        Self {
            state: ToneState::initial(),
            dispatch_gate: RateGate::new(min_update_interval),
            accept_gate: RateGate::new(min_update_interval),
            in_flight: None,
            tracker,
        }
    }

    pub fn state(&self) -> &ToneState {
        &self.state
    }

    /// Fast path for an agent utterance.
    pub fn on_agent_utterance<S: AsRef<str>>(&mut self, signals: &[S], text: &str) -> &ToneState {
        self.state = apply_local_heuristic(&self.state, signals, text);
        &self.state
    }

    /// Fast path for a representative utterance: pattern counters only.
    pub fn on_rep_utterance(&mut self, text: &str) -> PatternHits {
        self.tracker.observe(&mut self.state, text)
    }

    /// Produce an arbitration request if none is outstanding and the window has elapsed.
    ///
    /// Requests that would land inside the window are skipped, not deferred.
    pub fn begin_arbitration(
        &mut self,
        now: Instant,
        last_agent: &str,
        last_rep: &str,
    ) -> Option<ToneRequest> {
        if self.in_flight.is_some() {
            debug!("arbitration skipped: request outstanding");
            return None;
        }
        if !self.dispatch_gate.try_pass(now) {
            debug!("arbitration skipped: inside rate window");
            return None;
        }

        self.in_flight = Some(now);
        Some(ToneRequest {
            current_state: self.state.clone(),
            last_doctor: last_agent.to_owned(),
            last_mr: last_rep.to_owned(),
        })
    }

    /// Record that the outstanding request failed. State is left as is.
    pub fn arbitration_failed(&mut self) {
        self.in_flight = None;
    }

    /// Fold a remote decision into the state.
    ///
    /// The window is checked at the dispatch instant of the outstanding request, or at `now` when
    /// there is none.
    pub fn apply_arbitration(&mut self, decision: &ToneDecision, now: Instant) -> ArbitrationOutcome {
        let stamp = self.in_flight.take().unwrap_or(now);

        if !self.accept_gate.is_open(stamp) {
            debug!("arbitration decision dropped: inside rate window");
            return ArbitrationOutcome::RateLimited;
        }

        let Some(mut next) = self.state.merged_with(decision) else {
            debug!("arbitration decision dropped: not significant");
            return ArbitrationOutcome::Insignificant;
        };

        self.accept_gate.try_pass(stamp);

        let cut_now = decision.wants_cut() && !next.cut_now_triggered;
        if cut_now {
            next.cut_now_triggered = true;
            info!("agent asked to end the call");
        }

        info!(
            mood = %next.mood,
            time_pressure = next.time_pressure,
            skepticism = next.skepticism,
            patience = next.patience,
            "arbitration decision accepted"
        );
        self.state = next;
        ArbitrationOutcome::Accepted { cut_now }
    }
}
