use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hound::{SampleFormat, WavReader};
use serde_json::json;
use tokio::time::Instant;

use parley::Opts;
use parley::patterns::PatternTracker;
use parley::tone::ToneState;
use parley::vad::{SpeechEvent, VadPolicy, VoiceActivityDetector, rms_centered};

fn main() -> Result<()> {
    parley::logging::init();
    let params = Params::parse();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Some(audio) = &params.audio_path {
        replay_audio(&params, audio, &mut out)?;
    }
    if let Some(script) = &params.script_path {
        replay_script(&params, script, &mut out)?;
    }
    if params.audio_path.is_none() && params.script_path.is_none() {
        bail!("nothing to replay: pass --audio and/or --script");
    }

    out.flush()?;
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "parley-replay")]
#[command(about = "Replay a recording through the VAD and a script through the pattern tracker")]
struct Params {
    /// WAV recording of the representative's microphone.
    #[arg(short = 'a', long = "audio")]
    pub audio_path: Option<PathBuf>,

    /// JSON array of representative utterances.
    #[arg(short = 's', long = "script")]
    pub script_path: Option<PathBuf>,

    /// Analysis frame length in milliseconds.
    #[arg(long = "frame-ms", default_value_t = 16)]
    pub frame_ms: u32,

    #[arg(long = "high")]
    pub high_threshold: Option<f32>,

    #[arg(long = "low")]
    pub low_threshold: Option<f32>,

    #[arg(long = "hold-ms")]
    pub hold_ms: Option<u64>,

    #[arg(long = "monologue-words")]
    pub monologue_words: Option<usize>,
}

impl Params {
    fn opts(&self) -> Opts {
        let defaults = Opts::default();
        Opts {
            vad_high_threshold: self.high_threshold.unwrap_or(defaults.vad_high_threshold),
            vad_low_threshold: self.low_threshold.unwrap_or(defaults.vad_low_threshold),
            vad_hold: self
                .hold_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.vad_hold),
            monologue_word_threshold: self
                .monologue_words
                .unwrap_or(defaults.monologue_word_threshold),
            ..defaults
        }
    }
}

fn replay_audio(params: &Params, path: &Path, out: &mut impl Write) -> Result<()> {
    let (samples, sample_rate) = read_mono(path)?;
    let policy = VadPolicy::from_opts(&params.opts()).context("invalid VAD thresholds")?;
    let mut vad = VoiceActivityDetector::new(policy);

    let frame_len = ((sample_rate as u64 * params.frame_ms.max(1) as u64) / 1000).max(1) as usize;
    let t0 = Instant::now();

    for (i, frame) in samples.chunks(frame_len).enumerate() {
        let offset = Duration::from_secs_f64((i * frame_len) as f64 / sample_rate as f64);
        let loudness = rms_centered(frame);
        let Some(edge) = vad.feed_at(loudness, t0 + offset) else {
            continue;
        };

        let event = match edge {
            SpeechEvent::SpeechStarted => "speech_started",
            SpeechEvent::SpeechEnded => "speech_ended",
        };
        let line = json!({
            "event": event,
            "offset_ms": offset.as_millis() as u64,
            "loudness": loudness,
        });
        writeln!(out, "{line}")?;
    }

    Ok(())
}

fn replay_script(params: &Params, path: &Path, out: &mut impl Write) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let utterances: Vec<String> =
        serde_json::from_str(&raw).context("script must be a JSON array of strings")?;

    let tracker = PatternTracker::new(params.opts().monologue_word_threshold);
    let mut state = ToneState::initial();

    for utterance in &utterances {
        let hits = tracker.observe(&mut state, utterance);
        let line = json!({
            "utterance": utterance,
            "hype": hits.hype,
            "evidence": hits.evidence,
            "monologue": hits.monologue,
            "hypeCount": state.hype_count,
            "evidenceCount": state.evidence_count,
            "monologueCount": state.monologue_count,
        });
        writeln!(out, "{line}")?;
    }

    Ok(())
}

/// Decode a WAV file into mono `f32` samples in `[-1, 1]`.
fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to decode integer samples")?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}
