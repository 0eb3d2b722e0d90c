//! Session nudging: instruction deltas pushed to the live realtime session.
//!
//! Every message is built by a pure function of the tone state (or the VAD edge), so the exact
//! text the agent receives can be tested without a channel. [`SessionNudger`] only serializes
//! and hands frames to the channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::LiveChannel;
use crate::tone::{Mood, ToneDecision, ToneState};
use crate::vad::SpeechEvent;

pub const SESSION_UPDATE: &str = "session.update";

/// Persona brief sent once with the opening `session.update`.
pub const OPENING_HINT: &str = "You are a VERY busy senior physician with patients waiting. \
Keep ALL replies under 5 seconds. If MR uses hype words or talks too long, you WILL end the call. \
Be direct, firm, and impatient. Ask for specific medical evidence (trial data, endpoints, safety \
profile, guidelines, biomarkers, etc.) immediately when claims are vague.";

const REP_SPEAKING: &str =
    "Rep is speaking now. Pause or keep responses short; resume after the rep finishes.";
const REP_FINISHED: &str =
    "Rep finished speaking. You may respond now; remain concise under time pressure.";

/// One outbound data-channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<ToneSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(
        default,
        rename = "pauseReply",
        skip_serializing_if = "Option::is_none"
    )]
    pub pause_reply: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub instructions: String,
}

/// The tone triple the agent is steered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneSnapshot {
    pub mood: Mood,
    pub time_pressure: u8,
    pub skepticism: u8,
}

impl From<&ToneState> for ToneSnapshot {
    fn from(s: &ToneState) -> Self {
        Self {
            mood: s.mood,
            time_pressure: s.time_pressure,
            skepticism: s.skepticism,
        }
    }
}

impl OutboundEvent {
    fn update() -> Self {
        Self {
            kind: SESSION_UPDATE.to_owned(),
            session: None,
            tone: None,
            hint: None,
            pause_reply: None,
        }
    }

    fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.session = Some(SessionPatch {
            instructions: instructions.into(),
        });
        self
    }

    fn with_tone(mut self, state: &ToneState) -> Self {
        self.tone = Some(state.into());
        self
    }
}

/// Base behaviour rules for the agent persona.
pub fn session_instructions() -> String {
    [
        "You are a busy, senior medical doctor speaking in realtime via voice.",
        "Persona is not manually selected; infer and adapt dynamically based on the rep's behavior.",
        "Continuously adjust mood, time pressure, skepticism, and stage as the conversation evolves.",
        "Default stance: concise, professional, low patience; prefer replies under ~7 seconds.",
        "MR Coaching rules:",
        "- If rep uses vague claims (e.g., 'best') without proof, express irritation and request evidence.",
        "- If asked for evidence, expect trials, n-sizes, outcomes, guideline mentions.",
        "- If rep is concise and relevant, be engaged and progress the stage.",
        "- Under time pressure, prefer brevity and move to closure when appropriate.",
        "Outputs must be spoken responses; keep them persona-consistent and professional.",
        "Respond in English only.",
    ]
    .join("\n")
}

/// Short behaviour cue reflecting the current tone.
pub fn dynamic_guidance(state: &ToneState) -> String {
    let closing = match state.mood {
        Mood::Dismissive => {
            "Be concise, ask for concrete evidence, and guide towards closure if irrelevancy persists."
        }
        Mood::Engaged => "Invite brief but deeper, evidence-based discussion and progress the stage.",
        Mood::Neutral => "Maintain professional neutrality; request relevant, evidence-based points.",
    };

    [
        "-- Dynamic Doctor Behavior Hints (do not read verbatim) --".to_owned(),
        format!("Current mood cue: {}", state.mood),
        format!("Time pressure level: {} (0-5)", state.time_pressure),
        format!("Skepticism level: {} (0-5)", state.skepticism),
        format!(
            "Patience: {} (0-5), Engagement: {} (0-5)",
            state.patience, state.engagement
        ),
        closing.to_owned(),
    ]
    .join("\n")
}

/// First message on a freshly opened channel.
pub fn opening(state: &ToneState) -> OutboundEvent {
    let mut event = OutboundEvent::update()
        .with_instructions(session_instructions())
        .with_tone(state);
    event.hint = Some(OPENING_HINT.to_owned());
    event
}

/// Nudge after a fast-path tone update.
pub fn tone_nudge(state: &ToneState) -> OutboundEvent {
    OutboundEvent::update()
        .with_instructions(dynamic_guidance(state))
        .with_tone(state)
}

/// Nudge after an accepted arbitration decision. The hint is capped at `max_hint_chars` chars.
pub fn arbitration(state: &ToneState, decision: &ToneDecision, max_hint_chars: usize) -> OutboundEvent {
    let mut event = OutboundEvent::update().with_tone(state);
    event.hint = Some(
        decision
            .action
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(max_hint_chars)
            .collect(),
    );
    event.pause_reply = Some(decision.pause_reply.unwrap_or(false));
    event
}

/// Transient barge-in cue for a local speech edge.
pub fn barge_in(edge: SpeechEvent) -> OutboundEvent {
    let text = match edge {
        SpeechEvent::SpeechStarted => REP_SPEAKING,
        SpeechEvent::SpeechEnded => REP_FINISHED,
    };
    OutboundEvent::update().with_instructions(text)
}

/// Fire-and-forget sender for [`OutboundEvent`]s.
#[derive(Clone)]
pub struct SessionNudger {
    channel: Arc<dyn LiveChannel>,
}

impl std::fmt::Debug for SessionNudger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionNudger").finish_non_exhaustive()
    }
}

impl SessionNudger {
    pub fn new(channel: Arc<dyn LiveChannel>) -> Self {
        Self { channel }
    }

    /// Queue `event` on the channel. Failures are logged and swallowed.
    ///
    /// Returns whether the frame was handed to the channel.
    pub fn send(&self, event: &OutboundEvent) -> bool {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound event");
                return false;
            }
        };

        match self.channel.send_text(frame) {
            Ok(()) => {
                debug!(
                    has_instructions = event.session.is_some(),
                    has_tone = event.tone.is_some(),
                    has_hint = event.hint.is_some(),
                    "nudge sent"
                );
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to send nudge");
                false
            }
        }
    }
}
