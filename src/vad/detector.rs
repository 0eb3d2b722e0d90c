use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::opts::Opts;

/// Hysteresis knobs for the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadPolicy {
    /// Loudness at or above which speech starts (and the hold timer is refreshed).
    pub high_threshold: f32,
    /// Loudness at or below which speech may end.
    pub low_threshold: f32,
    /// How long after the last loud sample a quiet one may end speech.
    pub hold: Duration,
}

pub const DEFAULT_VAD_POLICY: VadPolicy = VadPolicy {
    high_threshold: 0.08,
    low_threshold: 0.03,
    hold: Duration::from_millis(250),
};

impl Default for VadPolicy {
    fn default() -> Self {
        DEFAULT_VAD_POLICY
    }
}

impl VadPolicy {
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        let policy = Self {
            high_threshold: opts.vad_high_threshold,
            low_threshold: opts.vad_low_threshold,
            hold: opts.vad_hold,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Thresholds must leave a dead zone between them, and both must be valid loudness values.
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !in_range(self.high_threshold) || !in_range(self.low_threshold) {
            return Err(Error::msg(format!(
                "VAD thresholds must lie in [0, 1], got high={} low={}",
                self.high_threshold, self.low_threshold
            )));
        }
        if self.high_threshold <= self.low_threshold {
            return Err(Error::msg(format!(
                "VAD high threshold ({}) must exceed low threshold ({})",
                self.high_threshold, self.low_threshold
            )));
        }
        Ok(())
    }
}

/// An edge in local speech activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    SpeechStarted,
    SpeechEnded,
}

/// Two-threshold detector with hold-time debouncing.
///
/// Loudness between the thresholds never changes state, so noise hovering around a single level
/// cannot make the detector flap.
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    policy: VadPolicy,
    speaking: bool,
    last_above: Option<Instant>,
}

impl VoiceActivityDetector {
    pub fn new(policy: VadPolicy) -> Self {
        Self {
            policy,
            speaking: false,
            last_above: None,
        }
    }

    pub fn policy(&self) -> VadPolicy {
        self.policy
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one loudness reading taken now.
    pub fn feed(&mut self, loudness: f32) -> Option<SpeechEvent> {
        self.feed_at(loudness, Instant::now())
    }

    /// Feed one loudness reading taken at `now`.
    ///
    /// Readings must be fed in time order. NaN counts as silence.
    pub fn feed_at(&mut self, loudness: f32, now: Instant) -> Option<SpeechEvent> {
        let loud = loudness >= self.policy.high_threshold;

        if !self.speaking {
            if loud {
                self.speaking = true;
                self.last_above = Some(now);
                debug!(loudness, "speech started");
                return Some(SpeechEvent::SpeechStarted);
            }
            return None;
        }

        if loud {
            self.last_above = Some(now);
            return None;
        }

        let quiet = loudness <= self.policy.low_threshold || loudness.is_nan();
        let held_long_enough = self
            .last_above
            .is_none_or(|at| now.saturating_duration_since(at) > self.policy.hold);

        if quiet && held_long_enough {
            self.speaking = false;
            debug!(loudness, "speech ended");
            return Some(SpeechEvent::SpeechEnded);
        }
        None
    }

    /// Back to silent, forgetting the last loud reading.
    pub fn reset(&mut self) {
        self.speaking = false;
        self.last_above = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: Duration = Duration::from_millis(1);

    fn detector() -> VoiceActivityDetector {
        VoiceActivityDetector::new(DEFAULT_VAD_POLICY)
    }

    /// Feed `values` spaced `step` apart starting at `t0`, collecting every emitted event.
    fn run(
        vad: &mut VoiceActivityDetector,
        t0: Instant,
        step: Duration,
        values: impl IntoIterator<Item = f32>,
    ) -> Vec<(usize, SpeechEvent)> {
        values
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let at = t0 + step * i as u32;
                vad.feed_at(v, at).map(|e| (i, e))
            })
            .collect()
    }

    #[test]
    fn dead_zone_never_flaps() {
        let mut vad = detector();
        let t0 = Instant::now();
        let (lo, hi) = (0.03 + 0.001, 0.08 - 0.001);
        let values = (0..2_000).map(|i| if i % 2 == 0 { lo } else { hi });
        assert!(run(&mut vad, t0, Duration::from_millis(7), values).is_empty());
        assert!(!vad.is_speaking());
    }

    #[test]
    fn dead_zone_keeps_speaking_state() {
        let mut vad = detector();
        let t0 = Instant::now();
        assert_eq!(vad.feed_at(0.5, t0), Some(SpeechEvent::SpeechStarted));
        // Long after the hold, mid-band loudness still does not end speech.
        assert_eq!(vad.feed_at(0.05, t0 + Duration::from_secs(5)), None);
        assert!(vad.is_speaking());
    }

    #[test]
    fn hold_boundary() {
        let mut vad = detector();
        let t0 = Instant::now();
        let hold = DEFAULT_VAD_POLICY.hold;

        assert_eq!(vad.feed_at(0.2, t0), Some(SpeechEvent::SpeechStarted));
        assert_eq!(vad.feed_at(0.0, t0 + hold - EPS), None);
        assert_eq!(vad.feed_at(0.0, t0 + hold), None);
        assert_eq!(vad.feed_at(0.0, t0 + hold + EPS), Some(SpeechEvent::SpeechEnded));
        assert_eq!(vad.feed_at(0.0, t0 + hold * 4), None);
    }

    #[test]
    fn loud_samples_refresh_the_hold() {
        let mut vad = detector();
        let t0 = Instant::now();
        let ms = Duration::from_millis;

        vad.feed_at(0.2, t0);
        vad.feed_at(0.2, t0 + ms(200));
        assert_eq!(vad.feed_at(0.0, t0 + ms(300)), None);
        assert_eq!(vad.feed_at(0.0, t0 + ms(451)), Some(SpeechEvent::SpeechEnded));
    }

    #[test]
    fn tight_cadence() {
        let mut vad = detector();
        let t0 = Instant::now();
        let step = Duration::from_micros(500);

        // 10 ms of speech then 400 ms of silence at 2 kHz.
        let values = (0..820).map(|i| if i < 20 { 0.3 } else { 0.0 });
        let events = run(&mut vad, t0, step, values);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], (0, SpeechEvent::SpeechStarted));
        // Last loud sample at index 19 (9.5 ms); the first sample strictly past the hold ends it.
        let (end_idx, end) = events[1];
        assert_eq!(end, SpeechEvent::SpeechEnded);
        assert_eq!(end_idx, 19 + 501);
    }

    #[test]
    fn loose_cadence_near_the_hold() {
        let mut vad = detector();
        let t0 = Instant::now();

        // One reading every hold interval: the first quiet reading sits exactly on the boundary.
        let step = DEFAULT_VAD_POLICY.hold;
        let events = run(&mut vad, t0, step, [0.3, 0.0, 0.0, 0.0]);
        assert_eq!(
            events,
            vec![(0, SpeechEvent::SpeechStarted), (2, SpeechEvent::SpeechEnded)]
        );

        // Slightly coarser than the hold: every quiet reading is already past it.
        let mut vad = detector();
        let step = DEFAULT_VAD_POLICY.hold + EPS;
        let events = run(&mut vad, t0, step, [0.3, 0.0, 0.3, 0.0]);
        assert_eq!(
            events,
            vec![
                (0, SpeechEvent::SpeechStarted),
                (1, SpeechEvent::SpeechEnded),
                (2, SpeechEvent::SpeechStarted),
                (3, SpeechEvent::SpeechEnded),
            ]
        );
    }

    #[test]
    fn reset_returns_to_silence() {
        let mut vad = detector();
        let t0 = Instant::now();
        vad.feed_at(0.9, t0);
        vad.reset();
        assert!(!vad.is_speaking());
        assert_eq!(vad.feed_at(0.0, t0 + EPS), None);
        assert_eq!(vad.feed_at(0.9, t0 + EPS * 2), Some(SpeechEvent::SpeechStarted));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let opts = Opts {
            vad_high_threshold: 0.02,
            vad_low_threshold: 0.05,
            ..Opts::default()
        };
        assert!(VadPolicy::from_opts(&opts).is_err());
        assert!(VadPolicy::from_opts(&Opts::default()).is_ok());
    }
}
