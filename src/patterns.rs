//! Representative-side behaviour tracking: hype language, evidence density, monologues.

use tracing::debug;

use crate::lexicon::{EVIDENCE_TERMS, HYPE_TERMS, contains_any};
use crate::tone::ToneState;

/// Default word count above which an utterance is a monologue.
pub const DEFAULT_MONOLOGUE_WORDS: usize = 25;

/// Which patterns one representative utterance exhibited. Categories are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternHits {
    pub hype: bool,
    pub evidence: bool,
    pub monologue: bool,
}

impl PatternHits {
    pub fn any(&self) -> bool {
        self.hype || self.evidence || self.monologue
    }
}

/// Scans finalized representative utterances against the phrase tables.
#[derive(Debug, Clone)]
pub struct PatternTracker {
    hype_terms: &'static [&'static str],
    evidence_terms: &'static [&'static str],
    monologue_words: usize,
}

impl Default for PatternTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MONOLOGUE_WORDS)
    }
}

impl PatternTracker {
    pub fn new(monologue_words: usize) -> Self {
        Self {
            hype_terms: HYPE_TERMS,
            evidence_terms: EVIDENCE_TERMS,
            monologue_words,
        }
    }

    /// Swap in different phrase tables (e.g. for another therapeutic area).
    pub fn with_tables(
        mut self,
        hype_terms: &'static [&'static str],
        evidence_terms: &'static [&'static str],
    ) -> Self {
        self.hype_terms = hype_terms;
        self.evidence_terms = evidence_terms;
        self
    }

    /// Classify one utterance. Pure; see [`ToneState::with_patterns`] for the counter side.
    pub fn scan(&self, utterance: &str) -> PatternHits {
        let lowered = utterance.to_lowercase();
        let words = utterance.split_whitespace().count();

        PatternHits {
            hype: contains_any(&lowered, self.hype_terms),
            evidence: contains_any(&lowered, self.evidence_terms),
            monologue: words > self.monologue_words,
        }
    }

    /// Classify one utterance and bump the matching counters in `state`.
    pub fn observe(&self, state: &mut ToneState, utterance: &str) -> PatternHits {
        let hits = self.scan(utterance);
        *state = state.with_patterns(hits);
        if hits.any() {
            debug!(
                hype = hits.hype,
                evidence = hits.evidence,
                monologue = hits.monologue,
                hype_count = state.hype_count,
                evidence_count = state.evidence_count,
                monologue_count = state.monologue_count,
                "representative pattern detected"
            );
        }
        hits
    }
}

impl ToneState {
    /// Return the state with one increment per detected pattern.
    pub fn with_patterns(&self, hits: PatternHits) -> ToneState {
        let bump = |count: u32, hit: bool| count.saturating_add(u32::from(hit));
        ToneState {
            hype_count: bump(self.hype_count, hits.hype),
            evidence_count: bump(self.evidence_count, hits.evidence),
            monologue_count: bump(self.monologue_count, hits.monologue),
            ..self.clone()
        }
    }
}
