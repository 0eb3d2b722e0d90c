use serde::{Deserialize, Serialize};

use super::state::{Mood, ToneState, clamp_level};

/// Body of a tone arbitration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneRequest {
    pub current_state: ToneState,
    #[serde(default)]
    pub last_doctor: String,
    #[serde(default)]
    pub last_mr: String,
}

/// A remote (authoritative) tone decision.
///
/// Every field is optional on the wire; an absent field leaves the local value untouched.
/// Levels are kept signed and unclamped here so that out-of-range remote values are clamped
/// exactly once, when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneDecision {
    pub mood: Option<Mood>,
    pub time_pressure: Option<i64>,
    pub skepticism: Option<i64>,
    pub patience: Option<i64>,
    pub engagement: Option<i64>,
    pub hype_count: Option<u32>,
    pub evidence_count: Option<u32>,
    pub monologue_count: Option<u32>,
    pub cut_now: Option<bool>,
    pub action: Option<String>,
    pub pause_reply: Option<bool>,
}

impl ToneDecision {
    /// Whether applying this decision would materially change the tone.
    ///
    /// Significant means the mood differs, or time pressure or skepticism moves by at least one
    /// level. Patience, engagement and counters alone never make a decision significant.
    pub fn is_significant(&self, current: &ToneState) -> bool {
        let mood_changed = self.mood.is_some_and(|m| m != current.mood);
        let moved = |remote: Option<i64>, local: u8| {
            remote.is_some_and(|v| (clamp_level(v) as i64 - local as i64).abs() >= 1)
        };

        mood_changed
            || moved(self.time_pressure, current.time_pressure)
            || moved(self.skepticism, current.skepticism)
    }

    pub fn wants_cut(&self) -> bool {
        self.cut_now.unwrap_or(false)
    }
}

impl ToneState {
    /// Merge a remote decision, or return `None` when it is not significant.
    ///
    /// Insignificant decisions are discarded whole: no field is applied, so noisy classification
    /// cannot nudge patience or counters on its own. Counters only ever move up; a remote count
    /// lower than ours is ignored. The cut-now flag is left for the caller to manage.
    pub fn merged_with(&self, decision: &ToneDecision) -> Option<ToneState> {
        if !decision.is_significant(self) {
            return None;
        }

        let level = |remote: Option<i64>, local: u8| remote.map_or(local, clamp_level);
        let count = |remote: Option<u32>, local: u32| remote.map_or(local, |v| v.max(local));

        Some(ToneState {
            mood: decision.mood.unwrap_or(self.mood),
            time_pressure: level(decision.time_pressure, self.time_pressure),
            skepticism: level(decision.skepticism, self.skepticism),
            patience: level(decision.patience, self.patience),
            engagement: level(decision.engagement, self.engagement),
            hype_count: count(decision.hype_count, self.hype_count),
            evidence_count: count(decision.evidence_count, self.evidence_count),
            monologue_count: count(decision.monologue_count, self.monologue_count),
            cut_now_triggered: self.cut_now_triggered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(mood: Mood, tp: i64, sk: i64) -> ToneDecision {
        ToneDecision {
            mood: Some(mood),
            time_pressure: Some(tp),
            skepticism: Some(sk),
            ..ToneDecision::default()
        }
    }

    #[test]
    fn identical_triple_is_not_significant() {
        let s = ToneState::initial();
        let d = ToneDecision {
            patience: Some(5),
            hype_count: Some(9),
            ..decision(Mood::Neutral, 4, 4)
        };
        assert!(!d.is_significant(&s));
        assert_eq!(s.merged_with(&d), None);
    }

    #[test]
    fn any_triple_change_is_significant() {
        let s = ToneState::initial();
        assert!(decision(Mood::Engaged, 4, 4).is_significant(&s));
        assert!(decision(Mood::Neutral, 3, 4).is_significant(&s));
        assert!(decision(Mood::Neutral, 4, 5).is_significant(&s));
    }

    #[test]
    fn out_of_range_remote_levels_compare_after_clamping() {
        let s = ToneState {
            time_pressure: 5,
            ..ToneState::initial()
        };
        assert!(!decision(Mood::Neutral, 11, 4).is_significant(&s));
    }

    #[test]
    fn absent_fields_keep_local_values() -> anyhow::Result<()> {
        let s = ToneState::initial();
        let d: ToneDecision = serde_json::from_str(r#"{"skepticism": 2}"#)?;
        let merged = s.merged_with(&d).expect("skepticism moved");
        assert_eq!(merged.skepticism, 2);
        assert_eq!(merged.mood, s.mood);
        assert_eq!(merged.time_pressure, s.time_pressure);
        assert_eq!(merged.patience, s.patience);
        Ok(())
    }

    #[test]
    fn merge_clamps_levels_and_never_lowers_counters() {
        let s = ToneState {
            hype_count: 3,
            evidence_count: 1,
            ..ToneState::initial()
        };
        let d = ToneDecision {
            engagement: Some(10),
            patience: Some(-2),
            hype_count: Some(1),
            evidence_count: Some(2),
            ..decision(Mood::Engaged, 1, 3)
        };
        let merged = s.merged_with(&d).expect("significant");
        assert_eq!(merged.engagement, 5);
        assert_eq!(merged.patience, 0);
        assert_eq!(merged.hype_count, 3);
        assert_eq!(merged.evidence_count, 2);
        assert_eq!(merged.time_pressure, 1);
    }

    #[test]
    fn parses_full_collaborator_response() -> anyhow::Result<()> {
        let raw = r#"{
            "mood": "Dismissive", "timePressure": 5, "skepticism": 5,
            "patience": 0, "engagement": 1,
            "hypeCount": 3, "evidenceCount": 0, "monologueCount": 1,
            "cutNow": true, "action": "Goodbye.", "pauseReply": false
        }"#;
        let d: ToneDecision = serde_json::from_str(raw)?;
        assert!(d.wants_cut());
        assert_eq!(d.mood, Some(Mood::Dismissive));
        assert_eq!(d.action.as_deref(), Some("Goodbye."));
        Ok(())
    }

    #[test]
    fn unknown_mood_rejects_the_whole_payload() {
        let res: Result<ToneDecision, _> = serde_json::from_str(r#"{"mood": "Furious"}"#);
        assert!(res.is_err());
    }
}
