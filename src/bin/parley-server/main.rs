use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, error, info, warn};

mod metrics;

use parley::patterns::DEFAULT_MONOLOGUE_WORDS;
use parley::tone::{HeuristicArbiter, ToneDecision, ToneRequest};

#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "HTTP tone arbitration service for coaching sessions")]
struct Params {
    /// Host interface to bind to.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8000)]
    port: u16,

    /// Word count above which a representative utterance counts as a monologue.
    #[arg(long = "monologue-words", default_value_t = DEFAULT_MONOLOGUE_WORDS)]
    monologue_words: usize,

    /// Maximum request body size (bytes).
    #[arg(long = "max-bytes", default_value_t = 64 * 1024)]
    max_bytes: usize,

    /// Per-request timeout (milliseconds).
    #[arg(long = "timeout-ms", default_value_t = 5_000)]
    timeout_ms: u64,
}

#[derive(Clone)]
struct AppState {
    arbiter: Arc<HeuristicArbiter>,
}

#[tokio::main]
async fn main() {
    parley::logging::init();

    if let Err(err) = run().await {
        error!(error = ?err, "parley-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let params = Params::parse();

    if let Err(err) = metrics::init() {
        warn!(error = ?err, "metrics disabled (init failed)");
    }

    let addr: SocketAddr = format!("{}:{}", params.host, params.port)
        .parse()
        .context("invalid host/port bind address")?;

    let state = AppState {
        arbiter: Arc::new(HeuristicArbiter::new(params.monologue_words)),
    };

    let app = router(state)
        .layer(DefaultBodyLimit::max(params.max_bytes))
        .layer(TimeoutLayer::new(Duration::from_millis(params.timeout_ms)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        );

    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/api/tone-decide", post(tone_decide))
        .route_layer(from_fn(metrics::track_http_metrics))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn root() -> &'static str {
    "parley-server: POST /api/tone-decide"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn tone_decide(
    State(state): State<AppState>,
    Json(req): Json<ToneRequest>,
) -> Json<ToneDecision> {
    let decision = state.arbiter.decide(&req);
    let cut_now = decision.wants_cut();
    metrics::record_tone_decision(cut_now);
    debug!(
        cut_now,
        mood = ?decision.mood,
        pause_reply = ?decision.pause_reply,
        "tone decided"
    );
    Json(decision)
}
