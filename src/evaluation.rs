//! Final evaluation request and the local compliance check.

use serde::{Deserialize, Serialize};

use crate::lexicon::{MUST_NOT_SAY, MUST_SAY};
use crate::transcript::TranscriptEntry;

/// Body posted to the evaluation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub transcript: Vec<TranscriptEntry>,
    pub persona_id: String,
    pub must_say: Vec<String>,
    pub must_not_say: Vec<String>,
}

impl EvaluationRequest {
    /// Request with the standard must-say / must-not-say lexicons.
    pub fn new(transcript: Vec<TranscriptEntry>, persona_id: impl Into<String>) -> Self {
        Self {
            transcript,
            persona_id: persona_id.into(),
            must_say: owned(MUST_SAY),
            must_not_say: owned(MUST_NOT_SAY),
        }
    }
}

fn owned<S: AsRef<str>>(phrases: &[S]) -> Vec<String> {
    phrases.iter().map(|p| p.as_ref().to_owned()).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub must_say_mentioned: Vec<String>,
    pub must_say_missed: Vec<String>,
    pub must_not_say_violations: Vec<String>,
}

/// Case-insensitive phrase check over the whole transcript, both speakers included.
pub fn check_compliance<S: AsRef<str>>(
    entries: &[TranscriptEntry],
    must_say: &[S],
    must_not_say: &[S],
) -> Compliance {
    let text = entries
        .iter()
        .map(|e| e.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let said = |phrase: &S| text.contains(&phrase.as_ref().to_lowercase());

    let (mentioned, missed): (Vec<&S>, Vec<&S>) = must_say.iter().partition(|p| said(*p));
    let violations: Vec<&S> = must_not_say.iter().filter(|p| said(*p)).collect();

    Compliance {
        must_say_mentioned: owned(&mentioned),
        must_say_missed: owned(&missed),
        must_not_say_violations: owned(&violations),
    }
}

/// Structured evaluation returned by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub compliance: Option<Compliance>,
    /// Everything else the collaborator sent (scores, feedback, per-turn analysis).
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}
