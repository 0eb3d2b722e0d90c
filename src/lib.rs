//! `parley` — the realtime core of a voice sales-coaching session.
//!
//! This crate provides:
//! - A tone engine that keeps a simulated agent's mood and patience in bounds
//! - Voice activity detection with hysteresis, for barge-in
//! - Session nudging over a live realtime data channel
//! - Deferred auto-hangup when the agent decides the call is over
//!
//! Transport (WebRTC, websockets) and the coaching API are collaborators, plugged in through the
//! [`Connector`] and [`Backend`] traits.

// High-level API (most consumers should start here).
pub mod opts;
pub mod session;

// Tone state, its transitions, and the phrase tables behind them.
pub mod lexicon;
pub mod patterns;
pub mod tone;

// Local speech detection.
pub mod vad;

// Live channel: transport seams, outbound nudges, inbound frames.
pub mod channel;
pub mod inbound;
pub mod nudge;

// Session-scoped bookkeeping.
pub mod coaching;
pub mod hangup;
pub mod input;
pub mod transcript;

// Collaborators.
pub mod backend;
pub mod backends;
pub mod evaluation;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use backend::Backend;
pub use channel::{Connection, Connector, LiveChannel, MediaControl};
pub use error::{Error, Result};
pub use opts::Opts;
pub use session::{EndReason, Session, SessionEvent, SessionHandle, SessionReport};
