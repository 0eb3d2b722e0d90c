use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound for every bounded tone level.
pub const LEVEL_MAX: u8 = 5;

/// The agent's overall disposition towards the representative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Neutral,
    Engaged,
    Dismissive,
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mood::Neutral => "Neutral",
            Mood::Engaged => "Engaged",
            Mood::Dismissive => "Dismissive",
        })
    }
}

/// Tone of the simulated agent for one session.
///
/// Invariants, upheld by every constructor and transition in this module:
/// - `time_pressure`, `skepticism`, `patience`, `engagement` stay within `0..=LEVEL_MAX`
/// - `hype_count`, `evidence_count`, `monologue_count` never decrease
/// - `cut_now_triggered` flips to `true` at most once
///
/// Transitions are pure: they take `&self` and return the next state, so the session actor is the
/// only place where a `ToneState` is ever replaced.
///
/// Serializes with the camelCase field names the arbitration collaborator expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneState {
    pub mood: Mood,
    pub time_pressure: u8,
    pub skepticism: u8,
    pub patience: u8,
    pub engagement: u8,
    pub hype_count: u32,
    pub evidence_count: u32,
    pub monologue_count: u32,
    #[serde(skip)]
    pub cut_now_triggered: bool,
}

/// A busy, skeptical senior physician with almost no patience left.
impl Default for ToneState {
    fn default() -> Self {
        Self {
            mood: Mood::Neutral,
            time_pressure: 4,
            skepticism: 4,
            patience: 1,
            engagement: 1,
            hype_count: 0,
            evidence_count: 0,
            monologue_count: 0,
            cut_now_triggered: false,
        }
    }
}

impl ToneState {
    /// Same as [`ToneState::default`]; reads better at session start.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Return a copy with every bounded level forced back into range.
    ///
    /// Deserialized states (e.g. from a remote request) can carry anything.
    pub fn clamped(&self) -> Self {
        Self {
            time_pressure: self.time_pressure.min(LEVEL_MAX),
            skepticism: self.skepticism.min(LEVEL_MAX),
            patience: self.patience.min(LEVEL_MAX),
            engagement: self.engagement.min(LEVEL_MAX),
            ..self.clone()
        }
    }
}

/// Clamp an arbitrary signed level into `0..=LEVEL_MAX`.
pub fn clamp_level(value: i64) -> u8 {
    value.clamp(0, LEVEL_MAX as i64) as u8
}

/// Apply a signed delta to a level, saturating at the range bounds.
pub fn shift_level(level: u8, delta: i64) -> u8 {
    clamp_level(level as i64 + delta)
}
