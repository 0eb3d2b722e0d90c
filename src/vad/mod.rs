//! Voice Activity Detection (VAD) for the representative's microphone.
//!
//! The sampler turns raw mic frames into loudness readings on its own task; the detector is a
//! plain state machine the session actor feeds from the other end of a bounded channel. Keeping
//! the two apart means the detector never cares how often it is called.

mod detector;
mod loudness;
mod sampler;

pub use detector::{DEFAULT_VAD_POLICY, SpeechEvent, VadPolicy, VoiceActivityDetector};
pub use loudness::{rms_centered, rms_from_time_domain};
pub use sampler::{LoudnessSample, spawn_sampler};
