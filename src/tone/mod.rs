//! Tone state engine.
//!
//! The state itself and its pure transitions live in `state`, `fast_path` and `decision`; the
//! [`ToneEngine`] wraps them with the rate limiting and edge triggering the session needs.

mod arbiter;
mod decision;
mod engine;
mod fast_path;
mod rate;
mod state;

pub use arbiter::HeuristicArbiter;
pub use decision::{ToneDecision, ToneRequest};
pub use engine::{ArbitrationOutcome, ToneEngine};
pub use fast_path::{SignalRule, apply_local_heuristic, classify};
pub use rate::RateGate;
pub use state::{LEVEL_MAX, Mood, ToneState, clamp_level, shift_level};
