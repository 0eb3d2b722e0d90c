//! Phrase tables driving detection policy.
//!
//! These are data, not logic: the trackers and heuristics only ever ask "does this lowercased
//! text contain any entry of table X". Matching is plain substring matching, so short entries
//! such as `"or"` or `"ae"` also fire inside longer words. That is the established policy;
//! tests pin down exactly which utterances move which counters.

/// Superlative / marketing language the agent reacts badly to.
pub const HYPE_TERMS: &[&str] = &[
    "best",
    "revolutionary",
    "amazing",
    "unbelievable",
    "game-changing",
    "breakthrough",
    "incredible",
];

/// Concrete clinical evidence markers.
pub const EVIDENCE_TERMS: &[&str] = &[
    // statistics
    "n=",
    "p=",
    "p-value",
    "confidence interval",
    "ci",
    "hazard ratio",
    "hr",
    "odds ratio",
    "or",
    // clinical endpoints
    "primary endpoint",
    "secondary endpoint",
    "efficacy",
    "response rate",
    "remission rate",
    "progression-free survival",
    "pfs",
    "overall survival",
    "os",
    "disease-free survival",
    "dfs",
    // trial design
    "randomized",
    "rct",
    "double-blind",
    "placebo-controlled",
    "phase",
    "multicenter",
    // safety
    "adverse events",
    "ae",
    "serious adverse events",
    "sae",
    "toxicity",
    "safety profile",
    // biomarkers
    "biomarker",
    "genetic",
    "mutation",
    "expression",
    "receptor",
    "pathway",
    // real-world evidence
    "real-world",
    "registry",
    "observational",
    "post-marketing",
    "surveillance",
    // guidelines
    "guidelines",
    "consensus",
    "recommendation",
    "standard of care",
    "treatment algorithm",
];

/// Hype words the arbiter treats as an immediate patience drain.
pub const ARBITER_HYPE_TERMS: &[&str] = &[
    "best",
    "revolutionary",
    "amazing",
    "unbelievable",
    "game-changing",
];

/// Hype words that end the call outright once patience is exhausted.
pub const HARD_STOP_HYPE_TERMS: &[&str] = &["best", "revolutionary", "amazing"];

/// Phrases signalling the representative is repeating themselves.
pub const REPETITION_PHRASES: &[&str] = &["as i said", "like i mentioned", "again", "repeating"];

/// Lines the agent closes the call with; picked by hype count.
pub const ENDING_PHRASES: &[&str] = &[
    "I'm ending this call. Send me the data sheet.",
    "I don't have time for this. Email me the trial results.",
    "I have patients waiting. This conversation is over.",
    "Send me the evidence, not the sales pitch. Goodbye.",
];

// Pre-classified agent signal tags, in fast-path precedence order.
pub const IMPATIENCE_SIGNALS: &[&str] = &["shows impatience", "wants to end call"];
pub const INTEREST_SIGNALS: &[&str] = &["expresses interest"];
pub const EVIDENCE_REQUEST_SIGNALS: &[&str] =
    &["asks for data", "requests evidence", "challenges claim"];

/// Keyword fallback: agent text that reads as interest.
pub const ENGAGEMENT_CUES: &[&str] = &["interesting", "tell me more"];

/// Keyword fallback: agent text that reads as time pressure.
pub const TIME_PRESSURE_CUES: &[&str] = &["time", "busy", "quick"];

// Coaching hint tables. Signal tags first, then keyword fallbacks over the agent's text.
pub const DATA_REQUEST_SIGNALS: &[&str] = &["asks for data", "requests evidence"];
pub const CHALLENGE_SIGNALS: &[&str] = &["challenges claim"];
pub const EVIDENCE_CUES: &[&str] = &["evidence", "trial", "study"];
pub const OBJECTION_CUES: &[&str] = &["objection", "concern", "worried"];
pub const CLOSURE_CUES: &[&str] = &["thank you", "goodbye", "end"];

/// Phrases the representative is expected to use at least once.
pub const MUST_SAY: &[&str] = &["evidence", "trial", "study", "patient outcomes"];

/// Phrases the representative must never use.
pub const MUST_NOT_SAY: &[&str] = &["best", "revolutionary", "amazing", "unbelievable"];

/// Whether `lowered` contains any entry of `table`.
///
/// Callers lowercase once and reuse the result across tables.
pub fn contains_any(lowered: &str, table: &[&str]) -> bool {
    table.iter().any(|term| lowered.contains(term))
}

/// Whether any of the given signal tags appears in `table` (case- and whitespace-insensitive).
pub fn has_signal<S: AsRef<str>>(signals: &[S], table: &[&str]) -> bool {
    signals.iter().any(|signal| {
        let signal = signal.as_ref().trim();
        table.iter().any(|tag| signal.eq_ignore_ascii_case(tag))
    })
}
