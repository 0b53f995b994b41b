//! HTTP adapter around the transcript pipeline.
//!
//! Routes:
//! - `GET /` landing page
//! - `GET /health`
//! - `GET /transcript?video_id=<id|url>&lang=<code>` canonical transcript JSON
//! - `GET /transcribe?url=<url>&lang=<code>` flattened text plus track kind

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::output::{PlainTextBody, TranscriptBody};
use crate::transcript::{Transcript, TranscriptPipeline, VideoRef};
use crate::utils::normalize_language_code;
use crate::{InvalidVideoRef, TranscriptError};

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Caption Relay</title>
    <style>
      body { font-family: Arial, sans-serif; background: #f7f7f7; margin: 0; padding: 0; }
      .center { text-align: center; margin-top: 15vh; }
      h1 { color: #c4302b; font-size: 2.6em; }
      .docs { max-width: 800px; margin: 2em auto; padding: 20px; background: white; border-radius: 8px; }
    </style>
  </head>
  <body>
    <div class="center">
      <h1>Caption Relay</h1>
      <p>Fetch YouTube captions as JSON</p>
    </div>
    <div class="docs">
      <h2>Endpoints</h2>
      <p><code>/transcript?video_id=VIDEO_ID&amp;lang=en</code> returns timed cues.</p>
      <p><code>/transcribe?url=VIDEO_URL</code> returns the caption text in one string.</p>
      <p>Example: <code>/transcript?video_id=dQw4w9WgXcQ</code></p>
    </div>
  </body>
</html>
"#;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pipeline: TranscriptPipeline,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: TranscriptPipeline, request_timeout: Duration) -> Self {
        Self {
            pipeline,
            request_timeout,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        let status = match &err {
            TranscriptError::NotFound
            | TranscriptError::Disabled
            | TranscriptError::VideoUnavailable => StatusCode::NOT_FOUND,
            TranscriptError::UpstreamFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

impl From<InvalidVideoRef> for ApiError {
    fn from(err: InvalidVideoRef) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind,
            "detail": self.detail,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct TranscriptQuery {
    pub video_id: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscribeQuery {
    pub url: Option<String>,
    pub lang: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/transcript", get(transcript))
        .route("/transcribe", get(transcribe))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;

    tracing::info!("Transcript service listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running transcript service")?;

    tracing::info!("Transcript service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.pipeline.provider_name(),
        "default_language": state.pipeline.default_language(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> ApiResult<Response> {
    let transcript = resolve(&state, query.video_id.as_deref(), "video_id", query.lang.as_deref()).await?;
    Ok(Json(TranscriptBody::from(&transcript)).into_response())
}

async fn transcribe(
    State(state): State<AppState>,
    Query(query): Query<TranscribeQuery>,
) -> ApiResult<Json<PlainTextBody>> {
    let transcript = resolve(&state, query.url.as_deref(), "url", query.lang.as_deref()).await?;
    Ok(Json(PlainTextBody::from(&transcript)))
}

async fn resolve(
    state: &AppState,
    raw_video: Option<&str>,
    parameter: &str,
    lang: Option<&str>,
) -> ApiResult<Transcript> {
    let raw_video = raw_video
        .ok_or_else(|| ApiError::bad_request(format!("Missing required query parameter '{}'", parameter)))?;
    let video = VideoRef::parse(raw_video)?;
    let lang = lang.and_then(normalize_language_code);

    let span = tracing::info_span!("request", request_id = %Uuid::new_v4(), video = %video);
    async {
        let result = state
            .pipeline
            .get_transcript_within(&video, lang.as_deref(), state.request_timeout)
            .await;
        match &result {
            Ok(transcript) => tracing::info!(
                language = %transcript.language_code,
                generated = transcript.is_generated,
                "Served {} cues",
                transcript.cues.len()
            ),
            Err(err) => tracing::info!(kind = err.kind(), "Request failed: {}", err),
        }
        result.map_err(ApiError::from)
    }
    .instrument(span)
    .await
}
