//! Rule-based tone arbitration.
//!
//! This is what the `parley-server` binary answers `POST /tone-decide` with, and what
//! [`crate::backends::LocalBackend`] uses when no remote collaborator is configured.

use crate::lexicon::{
    ARBITER_HYPE_TERMS, ENDING_PHRASES, EVIDENCE_TERMS, HARD_STOP_HYPE_TERMS,
    REPETITION_PHRASES, contains_any,
};
use crate::patterns::DEFAULT_MONOLOGUE_WORDS;

use super::decision::{ToneDecision, ToneRequest};
use super::state::{LEVEL_MAX, Mood, shift_level};

/// Stateless rule set mapping the last exchange onto a tone decision.
#[derive(Debug, Clone)]
pub struct HeuristicArbiter {
    monologue_words: usize,
}

impl Default for HeuristicArbiter {
    fn default() -> Self {
        Self {
            monologue_words: DEFAULT_MONOLOGUE_WORDS,
        }
    }
}

impl HeuristicArbiter {
    pub fn new(monologue_words: usize) -> Self {
        Self { monologue_words }
    }

    pub fn decide(&self, req: &ToneRequest) -> ToneDecision {
        let s = req.current_state.clamped();
        let rep = req.last_mr.to_lowercase();

        let mut mood;
        let mut time_pressure = s.time_pressure;
        let mut skepticism = s.skepticism;
        let mut patience = s.patience;
        let mut engagement = s.engagement;
        let mut hype_count = s.hype_count;
        let mut evidence_count = s.evidence_count;
        let mut monologue_count = s.monologue_count;
        let mut pause_reply = false;

        // Hard stops are judged on the state as it came in.
        let cut_now = s.hype_count >= 3
            || (s.monologue_count >= 2 && s.time_pressure >= 4)
            || (s.patience <= 1 && contains_any(&rep, HARD_STOP_HYPE_TERMS));

        let mut action = if contains_any(&rep, EVIDENCE_TERMS) {
            evidence_count = evidence_count.saturating_add(1);
            mood = Mood::Engaged;
            time_pressure = time_pressure.saturating_sub(2).max(1);
            skepticism = skepticism.saturating_sub(1).max(1);
            engagement = shift_level(engagement, 2);
            "Good. Now tell me about the clinical significance and practical implications."
        } else if contains_any(&rep, ARBITER_HYPE_TERMS) {
            hype_count = hype_count.saturating_add(1);
            patience = shift_level(patience, -2);
            mood = Mood::Dismissive;
            time_pressure = shift_level(time_pressure, 1);
            skepticism = shift_level(skepticism, 1);
            engagement = engagement.saturating_sub(1).max(1);
            "I need specifics, not marketing. What's the actual data?"
        } else if req.last_mr.split_whitespace().count() > self.monologue_words {
            monologue_count = monologue_count.saturating_add(1);
            patience = shift_level(patience, -1);
            mood = Mood::Dismissive;
            time_pressure = shift_level(time_pressure, 1);
            "I need the key points, not a presentation. Bottom line?"
        } else if contains_any(&rep, REPETITION_PHRASES) {
            patience = shift_level(patience, -1);
            mood = Mood::Dismissive;
            time_pressure = shift_level(time_pressure, 1);
            "I heard you the first time. What else do you have?"
        } else if time_pressure >= 4 {
            mood = Mood::Dismissive;
            pause_reply = true;
            "I have patients waiting. What's the key point?"
        } else {
            mood = Mood::Neutral;
            "Continue, but be concise."
        };

        if cut_now {
            action = ENDING_PHRASES[hype_count as usize % ENDING_PHRASES.len()];
            mood = Mood::Dismissive;
            time_pressure = LEVEL_MAX;
            patience = 0;
        }

        ToneDecision {
            mood: Some(mood),
            time_pressure: Some(time_pressure.into()),
            skepticism: Some(skepticism.into()),
            patience: Some(patience.into()),
            engagement: Some(engagement.into()),
            hype_count: Some(hype_count),
            evidence_count: Some(evidence_count),
            monologue_count: Some(monologue_count),
            cut_now: Some(cut_now),
            action: Some(action.to_owned()),
            pause_reply: Some(pause_reply),
        }
    }
}
