use std::error::Error as StdError;

use thiserror::Error;

/// Parley's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Parley's crate-wide error type.
///
/// The first three variants are fatal to whoever is establishing a session and are surfaced
/// from [`crate::Session::connect`]. Everything else shows up on best-effort paths
/// (arbitration, transcript mirroring, evaluation) where the session logs and moves on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session token missing or empty")]
    MissingToken,

    #[error("microphone access denied: {0}")]
    MediaDenied(String),

    #[error("failed to open live channel: {0}")]
    ChannelOpen(String),

    #[error("live channel is closed")]
    ChannelClosed,

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this error must abort session establishment.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingToken | Self::MediaDenied(_) | Self::ChannelOpen(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
