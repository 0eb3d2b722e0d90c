use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::loudness::rms_centered;

/// One loudness reading, stamped when its frame was measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    pub loudness: f32,
    pub at: Instant,
}

/// Spawn the sampling task.
///
/// Reads raw mic frames, measures each one and pushes the reading into a bounded channel of
/// `capacity`. The task never waits on the consumer: when the channel is full the reading is
/// dropped. It exits when `cancel` fires, the frame source closes, or the consumer goes away.
pub fn spawn_sampler(
    mut frames: mpsc::Receiver<Vec<f32>>,
    capacity: usize,
    cancel: CancellationToken,
) -> (JoinHandle<()>, mpsc::Receiver<LoudnessSample>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut dropped: u64 = 0;
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let sample = LoudnessSample {
                loudness: rms_centered(&frame),
                at: Instant::now(),
            };

            match tx.try_send(sample) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    trace!(dropped, "loudness channel full; sample dropped");
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
        debug!(dropped, "sampler stopped");
    });

    (handle, rx)
}
