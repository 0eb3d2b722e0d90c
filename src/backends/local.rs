use serde_json::{Map, Value};
use tracing::debug;

use crate::Result;
use crate::backend::Backend;
use crate::evaluation::{Evaluation, EvaluationRequest, check_compliance};
use crate::tone::{HeuristicArbiter, ToneDecision, ToneRequest};
use crate::transcript::TranscriptEntry;

/// Backend that never leaves the process.
///
/// Arbitration uses [`HeuristicArbiter`], mirroring is dropped, and evaluation is limited to the
/// compliance check.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    arbiter: HeuristicArbiter,
}

impl LocalBackend {
    pub fn new(arbiter: HeuristicArbiter) -> Self {
        Self { arbiter }
    }
}

impl Backend for LocalBackend {
    async fn decide_tone(&self, req: &ToneRequest) -> Result<ToneDecision> {
        Ok(self.arbiter.decide(req))
    }

    async fn mirror_transcript(&self, session_id: &str, entries: &[TranscriptEntry]) -> Result<()> {
        debug!(session_id, entries = entries.len(), "local backend: transcript not mirrored");
        Ok(())
    }

    async fn evaluate(&self, req: &EvaluationRequest) -> Result<Evaluation> {
        let compliance = check_compliance(&req.transcript, &req.must_say, &req.must_not_say);

        let mut details = Map::new();
        details.insert("persona_id".to_owned(), Value::from(req.persona_id.clone()));
        details.insert("turns".to_owned(), Value::from(req.transcript.len()));

        Ok(Evaluation {
            compliance: Some(compliance),
            details,
        })
    }
}
