//! Transport seams.
//!
//! Parley never negotiates media itself. Whatever establishes the realtime connection (WebRTC,
//! a websocket bridge, a test harness) hands the session a [`Connection`]: a data channel for
//! JSON text frames, an inbound frame stream, a stream of raw mic frames, and a handle on the
//! local/remote media.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Outbound half of the realtime data channel.
///
/// `send_text` must not block: implementations queue the frame and return.
pub trait LiveChannel: Send + Sync {
    fn send_text(&self, frame: String) -> Result<()>;

    /// Close the channel. Closing twice is a no-op.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Local capture and remote playback controls.
pub trait MediaControl: Send + Sync {
    /// Current remote playback volume (0..1).
    fn remote_volume(&self) -> f32;

    fn set_remote_volume(&self, volume: f32);

    /// Enable or disable the outgoing mic track without stopping capture.
    fn set_mic_enabled(&self, enabled: bool);

    /// Stop every local capture track.
    fn stop_capture(&self);

    /// Detach and release remote playback.
    fn release_remote(&self);
}

/// An established realtime connection.
pub struct Connection {
    pub channel: Arc<dyn LiveChannel>,
    /// Inbound data-channel text frames.
    pub inbound: mpsc::Receiver<String>,
    /// Raw mono mic frames, one buffer per capture callback.
    pub mic_frames: mpsc::Receiver<Vec<f32>>,
    pub media: Arc<dyn MediaControl>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("channel_closed", &self.channel.is_closed())
            .finish_non_exhaustive()
    }
}

/// Establishes connections. Errors returned here are fatal to [`crate::Session::connect`].
pub trait Connector: Send + Sync {
    /// Fetch the short-lived credential for the realtime service.
    fn fetch_token(&self) -> impl Future<Output = Result<String>> + Send;

    /// Acquire the microphone and open the realtime connection.
    fn open(&self, token: &str) -> impl Future<Output = Result<Connection>> + Send;
}

/// A [`LiveChannel`] that forwards frames into a tokio channel.
///
/// Useful for bridging to a transport that lives on another task, and in tests.
#[derive(Debug)]
pub struct QueueChannel {
    tx: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl QueueChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: AtomicBool::new(false),
            },
            rx,
        )
    }
}

impl LiveChannel for QueueChannel {
    fn send_text(&self, frame: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        self.tx.send(frame).map_err(|_| Error::ChannelClosed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}
