//! Route handlers

use crate::error::AppError;
use crate::sse::{self, SseItem};
use analyst_core::StatusEmitter;
use analyst_stock::{AnalysisPipeline, CompanyProfile, DecisionRequest, PersonaAnalysis};
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, instrument};

/// Wall-clock ceiling on a streamed run
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(900);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub static_dir: PathBuf,
    pub stream_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            static_dir: static_dir.into(),
            stream_timeout: STREAM_TIMEOUT,
        }
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }
}

/// Body of a successful `POST /api/analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ticker: String,
    pub report: String,
    pub financial_info: String,
    pub persona_analyses: Vec<PersonaAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_profile: Option<CompanyProfile>,
}

/// All routes, with permissive CORS and `/static` mounted when the directory exists
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/stream", post(analyze_stream));

    if state.static_dir.is_dir() {
        app = app.nest_service("/static", ServeDir::new(&state.static_dir));
    }

    app.with_state(state).layer(CorsLayer::permissive())
}

async fn index(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.static_dir.join("index.html")).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => Json(json!({ "message": "Template not found" })).into_response(),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

#[instrument(skip_all)]
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    info!("Analyze request: {}", request.user_message);
    let result = state.pipeline.run(&request.user_message).await?;

    Ok(Json(AnalyzeResponse {
        ticker: result.ticker.unwrap_or_default(),
        report: result.report.unwrap_or_default(),
        financial_info: result.financial_info.unwrap_or_default(),
        persona_analyses: result.persona_analyses.unwrap_or_default(),
        company_profile: result.company_profile,
    }))
}

async fn analyze_stream(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> impl IntoResponse {
    info!("Streaming analyze request: {}", request.user_message);
    let (emitter, events) = StatusEmitter::channel();

    let pipeline = state.pipeline.clone();
    let run = tokio::spawn(async move {
        // Outcome is reported through the event stream.
        let _ = pipeline.run_streaming(&request.user_message, emitter).await;
    });

    let (tx, rx) = mpsc::channel::<SseItem>(32);
    tokio::spawn(sse::relay(events, run, tx, state.stream_timeout));

    (
        [
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                axum::http::HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()),
    )
}
