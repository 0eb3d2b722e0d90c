//! Event-driven tone heuristics applied the moment an agent utterance arrives.
//!
//! Pre-classified signal tags win over text. Only when none of the known tags is present do we
//! fall back to scanning the utterance for keywords. When several tags are present the first rule
//! in [`SignalRule`] order decides; combinations carry no extra meaning.

use tracing::debug;

use crate::lexicon::{
    ENGAGEMENT_CUES, EVIDENCE_REQUEST_SIGNALS, IMPATIENCE_SIGNALS, INTEREST_SIGNALS,
    TIME_PRESSURE_CUES, contains_any, has_signal,
};

use super::state::{Mood, ToneState, shift_level};

/// Which fast-path rule matched an utterance, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRule {
    /// "shows impatience" / "wants to end call".
    Impatience,
    /// "expresses interest".
    Interest,
    /// "asks for data" / "requests evidence" / "challenges claim".
    EvidenceRequest,
    /// No known tag; keyword scan over the utterance text.
    KeywordFallback,
}

/// Pick the rule that governs this utterance.
pub fn classify<S: AsRef<str>>(signals: &[S]) -> SignalRule {
    if has_signal(signals, IMPATIENCE_SIGNALS) {
        SignalRule::Impatience
    } else if has_signal(signals, INTEREST_SIGNALS) {
        SignalRule::Interest
    } else if has_signal(signals, EVIDENCE_REQUEST_SIGNALS) {
        SignalRule::EvidenceRequest
    } else {
        SignalRule::KeywordFallback
    }
}

/// Compute the next tone after an agent utterance.
///
/// Only `mood` and `time_pressure` ever move on this path; counters and the cut-now flag are
/// untouched.
pub fn apply_local_heuristic<S: AsRef<str>>(
    state: &ToneState,
    signals: &[S],
    text: &str,
) -> ToneState {
    let mut next = state.clone();
    let rule = classify(signals);

    match rule {
        SignalRule::Impatience => {
            next.mood = Mood::Dismissive;
            next.time_pressure = shift_level(next.time_pressure, 1);
        }
        SignalRule::Interest => {
            next.mood = Mood::Engaged;
            next.time_pressure = shift_level(next.time_pressure, -1);
        }
        SignalRule::EvidenceRequest => {
            // Stay firm; under pressure this reads as dismissive.
            next.mood = if next.time_pressure >= 3 {
                Mood::Dismissive
            } else {
                Mood::Neutral
            };
        }
        SignalRule::KeywordFallback => {
            let lowered = text.to_lowercase();
            if contains_any(&lowered, ENGAGEMENT_CUES) {
                next.mood = Mood::Engaged;
            }
            if contains_any(&lowered, TIME_PRESSURE_CUES) {
                next.time_pressure = shift_level(next.time_pressure, 1);
            }
        }
    }

    debug!(
        ?rule,
        mood = %next.mood,
        time_pressure = next.time_pressure,
        "fast-path tone update"
    );
    next
}
