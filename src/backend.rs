use std::future::Future;

use crate::Result;
use crate::evaluation::{Evaluation, EvaluationRequest};
use crate::tone::{ToneDecision, ToneRequest};
use crate::transcript::TranscriptEntry;

/// Collaborators a session talks to besides the live channel.
///
/// Every call is made from a task spawned off the session timeline, so implementations may take
/// as long as they like; their futures only need to be `Send`. Failures are logged by the session
/// and never change its state.
pub trait Backend: Send + Sync + 'static {
    /// Authoritative tone arbitration for the last exchange.
    fn decide_tone(&self, req: &ToneRequest) -> impl Future<Output = Result<ToneDecision>> + Send;

    /// Append transcript entries to the collaborator's copy, in order.
    fn mirror_transcript(
        &self,
        session_id: &str,
        entries: &[TranscriptEntry],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Score a finished session.
    fn evaluate(&self, req: &EvaluationRequest) -> impl Future<Output = Result<Evaluation>> + Send;
}
