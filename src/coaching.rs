//! Coaching hints for the representative, derived from each agent utterance.

use serde::Serialize;

use crate::lexicon::{
    CHALLENGE_SIGNALS, CLOSURE_CUES, DATA_REQUEST_SIGNALS, ENGAGEMENT_CUES, EVIDENCE_CUES,
    IMPATIENCE_SIGNALS, INTEREST_SIGNALS, OBJECTION_CUES, TIME_PRESSURE_CUES, contains_any,
    has_signal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingKind {
    Start,
    Evidence,
    DeEscalate,
    Engagement,
    TimePressure,
    Objection,
    Closure,
    Generic,
    CallEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachingLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoachingHint {
    pub kind: CoachingKind,
    pub level: CoachingLevel,
    pub message: String,
}

impl CoachingHint {
    fn new(kind: CoachingKind, level: CoachingLevel, message: impl Into<String>) -> Self {
        Self {
            kind,
            level,
            message: message.into(),
        }
    }
}

/// Hint shown before the first exchange.
pub fn start_hint() -> CoachingHint {
    CoachingHint::new(
        CoachingKind::Start,
        CoachingLevel::Info,
        "Start your conversation - introduce yourself and the medication",
    )
}

/// Pick the hint for an agent utterance. Signals win over text.
pub fn hint_for<S: AsRef<str>>(agent_text: &str, signals: &[S]) -> CoachingHint {
    use CoachingKind::*;
    use CoachingLevel::*;

    let kind = if has_signal(signals, DATA_REQUEST_SIGNALS) {
        Evidence
    } else if has_signal(signals, IMPATIENCE_SIGNALS) {
        DeEscalate
    } else if has_signal(signals, INTEREST_SIGNALS) {
        Engagement
    } else if has_signal(signals, CHALLENGE_SIGNALS) {
        Objection
    } else {
        let lowered = agent_text.to_lowercase();
        if contains_any(&lowered, EVIDENCE_CUES) {
            Evidence
        } else if contains_any(&lowered, TIME_PRESSURE_CUES) {
            TimePressure
        } else if contains_any(&lowered, OBJECTION_CUES) {
            Objection
        } else if contains_any(&lowered, CLOSURE_CUES) {
            Closure
        } else if contains_any(&lowered, ENGAGEMENT_CUES) {
            Engagement
        } else {
            Generic
        }
    };

    match kind {
        Evidence => CoachingHint::new(
            kind,
            Warning,
            "Provide specific trial data, patient outcomes, or guideline references",
        ),
        DeEscalate => CoachingHint::new(
            kind,
            Warning,
            "Doctor seems irritated - acknowledge concerns and provide concrete evidence",
        ),
        Engagement => CoachingHint::new(
            kind,
            Success,
            "Good! Doctor is engaged - continue with evidence-based discussion",
        ),
        TimePressure => CoachingHint::new(
            kind,
            Warning,
            "Doctor seems pressed for time - be concise and focus on key benefits",
        ),
        Objection => CoachingHint::new(
            kind,
            Info,
            "Doctor raised an objection - address it directly with evidence",
        ),
        Closure => CoachingHint::new(
            kind,
            Info,
            "Doctor seems ready to end - summarize key points and next steps",
        ),
        _ => CoachingHint::new(
            Generic,
            Info,
            "Continue the conversation naturally - listen to the doctor's concerns",
        ),
    }
}

/// Shown the moment the auto-hangup ends the call.
pub fn call_ended(reason: &str) -> CoachingHint {
    CoachingHint::new(
        CoachingKind::CallEnded,
        CoachingLevel::Warning,
        format!("Call ended: {reason}"),
    )
}

/// Shown once the early-termination evaluation has been requested.
pub fn ended_early() -> CoachingHint {
    CoachingHint::new(
        CoachingKind::CallEnded,
        CoachingLevel::Error,
        "Session ended early due to doctor's patience exhaustion. Review your approach.",
    )
}
