use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley::channel::QueueChannel;
use parley::coaching::{CoachingKind, CoachingLevel};
use parley::evaluation::{Evaluation, EvaluationRequest};
use parley::input::InputEvent;
use parley::nudge;
use parley::tone::{Mood, ToneDecision, ToneRequest};
use parley::transcript::TranscriptEntry;
use parley::vad::SpeechEvent;
use parley::{
    Backend, Connection, Connector, EndReason, Error, LiveChannel, MediaControl, Opts, Result,
    Session, SessionEvent, SessionHandle,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

#[derive(Default)]
struct FakeBackend {
    decision: ToneDecision,
    decide_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
    mirrored: Mutex<Vec<usize>>,
}

impl Backend for FakeBackend {
    async fn decide_tone(&self, _req: &ToneRequest) -> Result<ToneDecision> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision.clone())
    }

    async fn mirror_transcript(&self, _session_id: &str, entries: &[TranscriptEntry]) -> Result<()> {
        self.mirrored.lock().unwrap().push(entries.len());
        Ok(())
    }

    async fn evaluate(&self, req: &EvaluationRequest) -> Result<Evaluation> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        let mut details = serde_json::Map::new();
        details.insert("turns".into(), req.transcript.len().into());
        Ok(Evaluation {
            compliance: None,
            details,
        })
    }
}

struct FakeMedia {
    volume: Mutex<f32>,
    mic_enabled: AtomicBool,
    capture_stopped: AtomicBool,
    remote_released: AtomicBool,
}

impl Default for FakeMedia {
    fn default() -> Self {
        Self {
            volume: Mutex::new(1.0),
            mic_enabled: AtomicBool::new(false),
            capture_stopped: AtomicBool::new(false),
            remote_released: AtomicBool::new(false),
        }
    }
}

impl FakeMedia {
    fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }
}

impl MediaControl for FakeMedia {
    fn remote_volume(&self) -> f32 {
        self.volume()
    }

    fn set_remote_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = volume;
    }

    fn set_mic_enabled(&self, enabled: bool) {
        self.mic_enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop_capture(&self) {
        self.capture_stopped.store(true, Ordering::SeqCst);
    }

    fn release_remote(&self) {
        self.remote_released.store(true, Ordering::SeqCst);
    }
}

struct FakeConnector {
    token: String,
    open_error: Option<fn() -> Error>,
    conn: Mutex<Option<Connection>>,
}

impl Connector for FakeConnector {
    async fn fetch_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn open(&self, _token: &str) -> Result<Connection> {
        if let Some(err) = self.open_error {
            return Err(err());
        }
        self.conn
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::ChannelOpen("already opened".into()))
    }
}

struct Harness {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    inbound: mpsc::Sender<String>,
    mic: mpsc::Sender<Vec<f32>>,
    outbound: mpsc::UnboundedReceiver<String>,
    channel: Arc<QueueChannel>,
    media: Arc<FakeMedia>,
    backend: Arc<FakeBackend>,
}

struct Wires {
    connector: FakeConnector,
    inbound: mpsc::Sender<String>,
    mic: mpsc::Sender<Vec<f32>>,
    outbound: mpsc::UnboundedReceiver<String>,
    channel: Arc<QueueChannel>,
    media: Arc<FakeMedia>,
}

fn wires(token: &str) -> Wires {
    let (channel, outbound) = QueueChannel::new();
    let channel = Arc::new(channel);
    let media = Arc::new(FakeMedia::default());
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let (mic_tx, mic_rx) = mpsc::channel(16);

    let conn = Connection {
        channel: channel.clone(),
        inbound: inbound_rx,
        mic_frames: mic_rx,
        media: media.clone(),
    };

    Wires {
        connector: FakeConnector {
            token: token.to_owned(),
            open_error: None,
            conn: Mutex::new(Some(conn)),
        },
        inbound: inbound_tx,
        mic: mic_tx,
        outbound,
        channel,
        media,
    }
}

async fn start(backend: FakeBackend) -> Harness {
    let w = wires("ephemeral-token");
    let backend = Arc::new(backend);
    let mut handle = Session::with_backend(Opts::default(), backend.clone())
        .connect(&w.connector)
        .await
        .expect("session connects");
    let events = handle.events().expect("first take");

    Harness {
        handle,
        events,
        inbound: w.inbound,
        mic: w.mic,
        outbound: w.outbound,
        channel: w.channel,
        media: w.media,
        backend,
    }
}

fn agent(text: &str, signals: &[&str]) -> String {
    serde_json::json!({
        "type": "conversation.item.created",
        "item": {
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }],
            "metadata": { "signals": signals },
        }
    })
    .to_string()
}

fn rep(text: &str) -> String {
    serde_json::json!({
        "type": "conversation.item.created",
        "item": {
            "type": "message",
            "role": "representative",
            "content": [{ "type": "input_text", "text": text }],
        }
    })
    .to_string()
}

fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

/// Let every ready task run, then move the paused clock by 1ms.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn cut_decision() -> ToneDecision {
    ToneDecision {
        mood: Some(Mood::Dismissive),
        time_pressure: Some(5),
        skepticism: Some(5),
        cut_now: Some(true),
        action: Some("I have to go now.".into()),
        ..ToneDecision::default()
    }
}

fn loud_frame() -> Vec<f32> {
    (0..160).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect()
}

#[tokio::test(start_paused = true)]
async fn agent_ending_the_call_hangs_up_after_delay() {
    let mut h = start(FakeBackend {
        decision: cut_decision(),
        ..FakeBackend::default()
    })
    .await;

    let t0 = Instant::now();
    h.inbound
        .send(agent("I really need to go.", &["wants to end call"]))
        .await
        .unwrap();
    settle().await;
    assert_eq!(h.backend.decide_calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(1_990)).await;
    assert!(!h.handle.is_finished());
    assert_eq!(h.backend.evaluate_calls.load(Ordering::SeqCst), 0);

    let report = h.handle.join().await.unwrap();
    assert!(t0.elapsed() >= Duration::from_millis(2_000));
    assert_eq!(report.reason, EndReason::AutoHangup);
    assert!(report.final_tone.cut_now_triggered);
    assert_eq!(report.final_tone.skepticism, 5);
    assert_eq!(h.backend.evaluate_calls.load(Ordering::SeqCst), 1);
    let evaluation = report.evaluation.expect("evaluation requested on auto-hangup");
    assert_eq!(evaluation.details["turns"], 1);

    assert!(h.channel.is_closed());
    assert!(h.media.capture_stopped.load(Ordering::SeqCst));
    assert!(h.media.remote_released.load(Ordering::SeqCst));

    let events = drain(&mut h.events);
    let armed = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::HangupArmed))
        .count();
    assert_eq!(armed, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Coaching(hint)
            if hint.kind == CoachingKind::CallEnded && hint.level == CoachingLevel::Warning
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Coaching(hint) if hint.level == CoachingLevel::Error
    )));
    assert_eq!(events.last(), Some(&SessionEvent::Ended(EndReason::AutoHangup)));

    let frames = drain(&mut h.outbound);
    let expected = serde_json::to_string(&nudge::arbitration(
        &report.final_tone,
        &cut_decision(),
        Opts::default().max_hint_chars,
    ))
    .unwrap();
    assert!(frames.contains(&expected));
}

#[tokio::test(start_paused = true)]
async fn stopping_while_armed_cancels_the_hangup() {
    let mut h = start(FakeBackend {
        decision: cut_decision(),
        ..FakeBackend::default()
    })
    .await;

    h.inbound
        .send(agent("I need to leave.", &["wants to end call"]))
        .await
        .unwrap();
    settle().await;
    sleep(Duration::from_millis(500)).await;

    h.handle.stop();
    let report = h.handle.join().await.unwrap();
    assert_eq!(report.reason, EndReason::Stopped);
    assert!(report.evaluation.is_none());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.backend.evaluate_calls.load(Ordering::SeqCst), 0);

    let events = drain(&mut h.events);
    assert!(events.contains(&SessionEvent::HangupArmed));
    assert!(!events.iter().any(|e| matches!(
        e,
        SessionEvent::Coaching(hint) if hint.kind == CoachingKind::CallEnded
    )));
    assert_eq!(events.last(), Some(&SessionEvent::Ended(EndReason::Stopped)));
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_releases_everything() {
    let mut h = start(FakeBackend::default()).await;
    assert!(h.media.mic_enabled.load(Ordering::SeqCst));

    h.handle.stop();
    h.handle.stop();
    let report = h.handle.join().await.unwrap();

    assert_eq!(report.reason, EndReason::Stopped);
    assert!(report.transcript.is_empty());
    assert!(h.channel.is_closed());
    assert!(h.media.capture_stopped.load(Ordering::SeqCst));
    assert!(h.media.remote_released.load(Ordering::SeqCst));

    let events = drain(&mut h.events);
    assert!(matches!(
        events.first(),
        Some(SessionEvent::Coaching(hint)) if hint.kind == CoachingKind::Start
    ));
    let ended = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Ended(_)))
        .count();
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn closed_inbound_channel_ends_the_session() {
    let h = start(FakeBackend::default()).await;
    drop(h.inbound);
    let report = h.handle.join().await.unwrap();
    assert_eq!(report.reason, EndReason::ChannelClosed);
    assert!(report.evaluation.is_none());
}

#[tokio::test(start_paused = true)]
async fn empty_token_aborts_before_opening() {
    let w = wires("  ");
    let err = Session::new(Opts::default(), FakeBackend::default())
        .connect(&w.connector)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingToken));
    // The connection was never taken.
    assert!(w.connector.conn.lock().unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn media_failure_is_surfaced() {
    let mut w = wires("ephemeral-token");
    w.connector.open_error = Some(|| Error::MediaDenied("permission dismissed".into()));
    let err = Session::new(Opts::default(), FakeBackend::default())
        .connect(&w.connector)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MediaDenied(_)));
    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn arbitration_is_rate_limited() {
    let h = start(FakeBackend::default()).await;

    h.inbound.send(agent("Go on.", &[])).await.unwrap();
    settle().await;
    sleep(Duration::from_millis(100)).await;
    h.inbound.send(agent("And?", &[])).await.unwrap();
    settle().await;
    assert_eq!(h.backend.decide_calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(1_000)).await;
    h.inbound.send(agent("Anything else?", &[])).await.unwrap();
    settle().await;
    assert_eq!(h.backend.decide_calls.load(Ordering::SeqCst), 2);

    h.handle.stop();
    let report = h.handle.join().await.unwrap();
    assert_eq!(report.transcript.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn insignificant_decision_sends_no_hint() {
    let mut h = start(FakeBackend {
        decision: ToneDecision {
            mood: Some(Mood::Neutral),
            time_pressure: Some(4),
            skepticism: Some(4),
            action: Some("ignored".into()),
            ..ToneDecision::default()
        },
        ..FakeBackend::default()
    })
    .await;

    h.inbound.send(agent("Go on.", &[])).await.unwrap();
    settle().await;
    h.handle.stop();
    h.handle.join().await.unwrap();

    let frames = drain(&mut h.outbound);
    // Opening plus one fast-path nudge.
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| !f.contains("pauseReply")));
}

#[tokio::test(start_paused = true)]
async fn rep_turns_feed_patterns_and_transcript_mirror() {
    let mut h = start(FakeBackend::default()).await;

    h.inbound.send(agent("What do you have?", &[])).await.unwrap();
    h.inbound
        .send(rep("Honestly it's the best drug on the market."))
        .await
        .unwrap();
    h.inbound.send(rep("   ")).await.unwrap();
    settle().await;

    assert_eq!(*h.backend.mirrored.lock().unwrap(), vec![2]);

    h.handle.stop();
    let report = h.handle.join().await.unwrap();
    assert_eq!(report.transcript.len(), 2);
    assert_eq!(report.final_tone.hype_count, 1);

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::Patterns(hits) if hits.hype)));
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped() {
    let h = start(FakeBackend::default()).await;

    h.inbound.send("{not json".into()).await.unwrap();
    h.inbound
        .send(r#"{"type":"conversation.item.created"}"#.into())
        .await
        .unwrap();
    h.inbound
        .send(r#"{"type":"response.audio.delta","delta":"AAAA"}"#.into())
        .await
        .unwrap();
    h.inbound.send(agent("Still here.", &[])).await.unwrap();
    settle().await;
    assert!(!h.handle.is_finished());

    h.handle.stop();
    let report = h.handle.join().await.unwrap();
    assert_eq!(report.transcript.len(), 1);
    assert_eq!(report.transcript[0].content, "Still here.");
}

#[tokio::test(start_paused = true)]
async fn local_speech_ducks_remote_audio() {
    let mut h = start(FakeBackend::default()).await;
    drain(&mut h.outbound);

    h.mic.send(loud_frame()).await.unwrap();
    settle().await;
    assert!((h.media.volume() - Opts::default().duck_volume).abs() < f32::EPSILON);

    // Quiet, but still inside the hold.
    h.mic.send(vec![0.0; 160]).await.unwrap();
    settle().await;
    assert!(h.media.volume() < 1.0);

    sleep(Duration::from_millis(300)).await;
    h.mic.send(vec![0.0; 160]).await.unwrap();
    settle().await;
    assert_eq!(h.media.volume(), 1.0);

    let speech: Vec<_> = drain(&mut h.events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::Speech(edge) => Some(edge),
            _ => None,
        })
        .collect();
    assert_eq!(
        speech,
        vec![SpeechEvent::SpeechStarted, SpeechEvent::SpeechEnded]
    );

    let frames = drain(&mut h.outbound);
    let started = serde_json::to_string(&nudge::barge_in(SpeechEvent::SpeechStarted)).unwrap();
    let ended = serde_json::to_string(&nudge::barge_in(SpeechEvent::SpeechEnded)).unwrap();
    assert_eq!(frames, vec![started, ended]);

    h.handle.stop();
    h.handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stopping_mid_speech_restores_volume() {
    let h = start(FakeBackend::default()).await;
    h.mic.send(loud_frame()).await.unwrap();
    settle().await;
    assert!(h.media.volume() < 1.0);

    h.handle.stop();
    h.handle.join().await.unwrap();
    assert_eq!(h.media.volume(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn mute_disables_the_mic_track() {
    let mut h = start(FakeBackend::default()).await;

    h.handle.input().send(InputEvent::ToggleMute).unwrap();
    settle().await;
    assert!(!h.media.mic_enabled.load(Ordering::SeqCst));

    h.handle.input().send(InputEvent::SetMuted(false)).unwrap();
    settle().await;
    assert!(h.media.mic_enabled.load(Ordering::SeqCst));

    h.handle.stop();
    h.handle.join().await.unwrap();

    let mic: Vec<_> = drain(&mut h.events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::MicEnabled(on) => Some(on),
            _ => None,
        })
        .collect();
    assert_eq!(mic, vec![false, true]);
}
