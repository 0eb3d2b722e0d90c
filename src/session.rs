//! The live coaching session.
//!
//! One tokio task owns every piece of mutable session state (tone, VAD, transcript, hangup
//! timer, mic gate) and handles one event at a time: loudness samples, inbound frames,
//! arbitration completions, input events and the hangup deadline. Network calls run on their
//! own tasks and re-enter the timeline as events, so nothing ever mutates state concurrently.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::channel::{Connector, LiveChannel, MediaControl};
use crate::coaching::{self, CoachingHint};
use crate::error::{Error, Result};
use crate::evaluation::{Evaluation, EvaluationRequest};
use crate::hangup::HangupController;
use crate::inbound::{InboundEvent, parse_inbound};
use crate::input::{InputEvent, MicGate};
use crate::nudge::{self, SessionNudger};
use crate::opts::Opts;
use crate::patterns::{PatternHits, PatternTracker};
use crate::tone::{ArbitrationOutcome, ToneDecision, ToneEngine, ToneState};
use crate::transcript::{Role, TranscriptEntry, TranscriptStore};
use crate::vad::{LoudnessSample, SpeechEvent, VadPolicy, VoiceActivityDetector, spawn_sampler};

const HANGUP_REASON: &str = "Call ended due to patience exhaustion";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// [`SessionHandle::stop`] was called.
    Stopped,
    /// The agent asked to end the call and the hangup delay elapsed.
    AutoHangup,
    /// The remote side closed the inbound channel.
    ChannelClosed,
}

/// Notifications for whoever hosts the session (UI, logs, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Coaching(CoachingHint),
    Speech(SpeechEvent),
    ToneChanged(ToneState),
    Patterns(PatternHits),
    MicEnabled(bool),
    HangupArmed,
    Ended(EndReason),
}

/// What is left once a session has ended.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub reason: EndReason,
    pub final_tone: ToneState,
    pub transcript: Vec<TranscriptEntry>,
    /// Present when the session ended on an auto-hangup and the evaluation call succeeded.
    pub evaluation: Option<Evaluation>,
}

/// A session that has not been connected yet.
#[derive(Debug)]
pub struct Session<B> {
    opts: Opts,
    backend: Arc<B>,
}

impl<B: Backend> Session<B> {
    pub fn new(opts: Opts, backend: B) -> Self {
        Self::with_backend(opts, Arc::new(backend))
    }

    /// Share one backend (and its HTTP connection pool) between sessions.
    pub fn with_backend(opts: Opts, backend: Arc<B>) -> Self {
        Self { opts, backend }
    }

    /// Establish the session and start its timeline.
    ///
    /// Fails with [`Error::MissingToken`] when the connector hands back an empty credential, and
    /// with whatever the connector reports when media or the channel cannot be set up. Nothing is
    /// left running on failure.
    pub async fn connect<C: Connector>(self, connector: &C) -> Result<SessionHandle> {
        let policy = VadPolicy::from_opts(&self.opts)?;

        let token = connector.fetch_token().await?;
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        let conn = connector.open(&token).await?;
        let session_id = Uuid::new_v4().to_string();
        info!(%session_id, "session connected");

        let nudger = SessionNudger::new(conn.channel.clone());
        let engine = ToneEngine::new(
            self.opts.min_tone_update_interval,
            PatternTracker::new(self.opts.monologue_word_threshold),
        );
        nudger.send(&nudge::opening(engine.state()));

        let gate = MicGate::default();
        conn.media.set_mic_enabled(gate.enabled());

        let cancel = CancellationToken::new();
        let (sampler, loudness) = spawn_sampler(
            conn.mic_frames,
            self.opts.loudness_queue_capacity,
            cancel.child_token(),
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (arbitration_tx, arbitration_rx) = mpsc::unbounded_channel();

        let _ = events_tx.send(SessionEvent::Coaching(coaching::start_hint()));

        let actor = Actor {
            hangup: HangupController::new(self.opts.hangup_delay),
            opts: self.opts,
            session_id: session_id.clone(),
            backend: self.backend,
            nudger,
            channel: conn.channel,
            media: conn.media,
            engine,
            vad: VoiceActivityDetector::new(policy),
            transcript: TranscriptStore::new(),
            gate,
            volume_before_duck: None,
            events: events_tx,
            arbitration_tx,
        };

        let inputs = Inputs {
            cancel: cancel.clone(),
            sampler,
            loudness,
            inbound: conn.inbound,
            arbitration: arbitration_rx,
            input: input_rx,
        };

        let task = tokio::spawn(actor.run(inputs));

        Ok(SessionHandle {
            session_id,
            cancel,
            input: input_tx,
            events: Some(events_rx),
            task,
        })
    }
}

/// Control surface of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    session_id: String,
    cancel: CancellationToken,
    input: mpsc::UnboundedSender<InputEvent>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ask the session to tear down. Calling this more than once is harmless.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Sender for mute / push-to-talk events.
    pub fn input(&self) -> mpsc::UnboundedSender<InputEvent> {
        self.input.clone()
    }

    /// Take the event stream. Only the first call returns it.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    /// Wait for the session to end and collect its report.
    pub async fn join(self) -> Result<SessionReport> {
        self.task.await.map_err(|err| Error::Other(Box::new(err)))
    }
}

/// Everything the actor waits on. Kept apart from [`Actor`] so handlers can borrow it mutably.
struct Inputs {
    cancel: CancellationToken,
    sampler: JoinHandle<()>,
    loudness: mpsc::Receiver<LoudnessSample>,
    inbound: mpsc::Receiver<String>,
    arbitration: mpsc::UnboundedReceiver<Result<ToneDecision>>,
    input: mpsc::UnboundedReceiver<InputEvent>,
}

struct Actor<B> {
    opts: Opts,
    session_id: String,
    backend: Arc<B>,
    nudger: SessionNudger,
    channel: Arc<dyn LiveChannel>,
    media: Arc<dyn MediaControl>,
    engine: ToneEngine,
    vad: VoiceActivityDetector,
    transcript: TranscriptStore,
    hangup: HangupController,
    gate: MicGate,
    volume_before_duck: Option<f32>,
    events: mpsc::UnboundedSender<SessionEvent>,
    arbitration_tx: mpsc::UnboundedSender<Result<ToneDecision>>,
}

impl<B: Backend> Actor<B> {
    async fn run(mut self, mut inputs: Inputs) -> SessionReport {
        let reason = loop {
            let deadline = self.hangup.deadline();

            tokio::select! {
                biased;

                _ = inputs.cancel.cancelled() => break EndReason::Stopped,

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.hangup.fire(Instant::now()) {
                        self.emit(SessionEvent::Coaching(coaching::call_ended(HANGUP_REASON)));
                        break EndReason::AutoHangup;
                    }
                }

                Some(result) = inputs.arbitration.recv() => self.on_arbitration(result),

                frame = inputs.inbound.recv() => match frame {
                    Some(frame) => self.on_frame(&frame),
                    None => break EndReason::ChannelClosed,
                },

                Some(sample) = inputs.loudness.recv() => self.on_loudness(sample),

                Some(event) = inputs.input.recv() => self.on_input(event),
            }
        };

        self.teardown(reason, inputs).await;
        self.finish(reason).await
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn on_frame(&mut self, frame: &str) {
        match parse_inbound(frame) {
            Ok(Some(InboundEvent::AgentUtterance { text, signals })) => {
                self.on_agent_utterance(text, signals)
            }
            Ok(Some(InboundEvent::RepUtterance { text })) => self.on_rep_utterance(text),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "dropping malformed inbound frame"),
        }
    }

    fn on_agent_utterance(&mut self, text: String, signals: Vec<String>) {
        let now = Instant::now();
        self.record(Role::Agent, &text, now);
        self.emit(SessionEvent::Coaching(coaching::hint_for(&text, &signals)));

        let state = self.engine.on_agent_utterance(&signals, &text).clone();
        self.nudger.send(&nudge::tone_nudge(&state));
        self.emit(SessionEvent::ToneChanged(state));

        let last_rep = self
            .transcript
            .last_by(Role::Representative)
            .unwrap_or_default()
            .to_owned();
        if let Some(req) = self.engine.begin_arbitration(now, &text, &last_rep) {
            let backend = Arc::clone(&self.backend);
            let tx = self.arbitration_tx.clone();
            tokio::spawn(async move {
                let result = backend.decide_tone(&req).await;
                // The session may already be gone.
                let _ = tx.send(result);
            });
        }
    }

    fn on_rep_utterance(&mut self, text: String) {
        self.record(Role::Representative, &text, Instant::now());
        let hits = self.engine.on_rep_utterance(&text);
        if hits.any() {
            self.emit(SessionEvent::Patterns(hits));
        }
    }

    fn record(&mut self, role: Role, text: &str, at: Instant) {
        let Some(batch) = self.transcript.append(role, text, at) else {
            return;
        };

        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.mirror_transcript(&session_id, &batch).await {
                warn!(error = %err, %session_id, "transcript mirror failed");
            }
        });
    }

    fn on_arbitration(&mut self, result: Result<ToneDecision>) {
        let decision = match result {
            Ok(decision) => decision,
            Err(err) => {
                self.engine.arbitration_failed();
                warn!(error = %err, "tone arbitration failed");
                return;
            }
        };

        let now = Instant::now();
        match self.engine.apply_arbitration(&decision, now) {
            ArbitrationOutcome::Accepted { cut_now } => {
                let state = self.engine.state().clone();
                if cut_now && self.hangup.arm(now) {
                    self.emit(SessionEvent::HangupArmed);
                }
                self.nudger.send(&nudge::arbitration(
                    &state,
                    &decision,
                    self.opts.max_hint_chars,
                ));
                self.emit(SessionEvent::ToneChanged(state));
            }
            outcome => debug!(?outcome, "arbitration decision not applied"),
        }
    }

    fn on_loudness(&mut self, sample: LoudnessSample) {
        let Some(edge) = self.vad.feed_at(sample.loudness, sample.at) else {
            return;
        };

        match edge {
            SpeechEvent::SpeechStarted => {
                self.volume_before_duck = Some(self.media.remote_volume());
                self.media.set_remote_volume(self.opts.duck_volume);
            }
            SpeechEvent::SpeechEnded => {
                if let Some(volume) = self.volume_before_duck.take() {
                    self.media.set_remote_volume(volume);
                }
            }
        }

        self.nudger.send(&nudge::barge_in(edge));
        self.media.set_mic_enabled(self.gate.enabled());
        self.emit(SessionEvent::Speech(edge));
    }

    fn on_input(&mut self, event: InputEvent) {
        let enabled = self.gate.apply(event);
        self.media.set_mic_enabled(enabled);
        self.emit(SessionEvent::MicEnabled(enabled));
    }

    /// Release everything the session holds. Runs exactly once, whatever ended the loop.
    async fn teardown(&mut self, reason: EndReason, inputs: Inputs) {
        info!(session_id = %self.session_id, ?reason, "session tearing down");

        self.hangup.cancel();

        inputs.cancel.cancel();
        if let Err(err) = inputs.sampler.await {
            warn!(error = %err, "sampler task failed");
        }

        self.channel.close();
        self.media.stop_capture();
        self.media.release_remote();
        if let Some(volume) = self.volume_before_duck.take() {
            self.media.set_remote_volume(volume);
        }
        self.vad.reset();
    }

    async fn finish(self, reason: EndReason) -> SessionReport {
        let evaluation = if reason == EndReason::AutoHangup {
            let req = EvaluationRequest::new(
                self.transcript.entries().to_vec(),
                self.opts.persona_id.clone(),
            );
            match self.backend.evaluate(&req).await {
                Ok(evaluation) => {
                    self.emit(SessionEvent::Coaching(coaching::ended_early()));
                    Some(evaluation)
                }
                Err(err) => {
                    warn!(error = %err, "final evaluation failed");
                    None
                }
            }
        } else {
            None
        };

        self.emit(SessionEvent::Ended(reason));
        info!(session_id = %self.session_id, ?reason, "session ended");

        SessionReport {
            session_id: self.session_id,
            reason,
            final_tone: self.engine.state().clone(),
            transcript: self.transcript.into_entries(),
            evaluation,
        }
    }
}
