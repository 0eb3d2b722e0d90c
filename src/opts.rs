use std::time::Duration;

use serde::Deserialize;

/// Options that control a coaching session.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// Binaries map their flags onto it; embedders can also deserialize it from JSON, in which case
/// any missing field falls back to the value in [`Opts::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Opts {
    /// Loudness at or above which local speech starts (RMS, 0..1).
    pub vad_high_threshold: f32,

    /// Loudness at or below which local speech may end (RMS, 0..1).
    pub vad_low_threshold: f32,

    /// How long loudness must stay out of the high band before speech is considered over.
    #[serde(with = "millis")]
    pub vad_hold: Duration,

    /// Minimum spacing between accepted tone arbitration requests.
    #[serde(with = "millis")]
    pub min_tone_update_interval: Duration,

    /// Delay between the agent asking to end the call and the session actually ending.
    #[serde(with = "millis")]
    pub hangup_delay: Duration,

    /// Remote playback volume while the representative is speaking.
    pub duck_volume: f32,

    /// Word count above which a representative utterance counts as a monologue.
    pub monologue_word_threshold: usize,

    /// Maximum length (in chars) of the arbitration hint forwarded to the live session.
    pub max_hint_chars: usize,

    /// Capacity of the bounded sampler → VAD channel. Samples are dropped when it is full.
    pub loudness_queue_capacity: usize,

    /// Base URL of the coaching API (`/tone-decide`, `/transcript/..`, `/voice/evaluate`).
    pub api_base: String,

    /// Persona the session simulates; forwarded with the final evaluation request.
    pub persona_id: String,

    /// Timeout applied to every collaborator HTTP call.
    #[serde(with = "millis")]
    pub http_timeout: Duration,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            vad_high_threshold: 0.08,
            vad_low_threshold: 0.03,
            vad_hold: Duration::from_millis(250),
            min_tone_update_interval: Duration::from_millis(900),
            hangup_delay: Duration::from_millis(2000),
            duck_volume: 0.2,
            monologue_word_threshold: 25,
            max_hint_chars: 200,
            loudness_queue_capacity: 64,
            api_base: "http://localhost:8000/api".to_owned(),
            persona_id: "doc_001".to_owned(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
