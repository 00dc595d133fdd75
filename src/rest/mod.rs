// rest/mod.rs — local HTTP API for the desktop GUI.
//
// Axum server on localhost only. One generation may be in flight at a
// time: the in-flight flag is claimed before a run and a second request is
// rejected with 409 while it is held, never queued.
//
// Endpoints:
//   GET  /api/v1/health
//   GET  /api/v1/project
//   POST /api/v1/preview
//   POST /api/v1/generate
//   GET  /api/v1/events   (SSE)

pub mod sse;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::{build_config, Answers};
use crate::error::ScaffoldError;
use crate::events::ProgressBroadcaster;
use crate::pipeline;
use crate::project;

pub const REST_PORT: u16 = 4777;

pub struct ServerState {
    pub root: PathBuf,
    pub progress: ProgressBroadcaster,
    in_flight: AtomicBool,
}

impl ServerState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            progress: ProgressBroadcaster::new(),
            in_flight: AtomicBool::new(false),
        }
    }
}

/// Released on drop, so a failing run never wedges the flag.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub async fn start_rest_server(state: Arc<ServerState>, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse()?;
    let router = build_router(state);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/project", get(get_project))
        .route("/api/v1/preview", post(post_preview))
        .route("/api/v1/generate", post(post_generate))
        .route("/api/v1/events", get(sse::progress_events_sse))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(err: &ScaffoldError) -> Response {
    let status = match err {
        ScaffoldError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScaffoldError::FileExists(_) => StatusCode::CONFLICT,
        ScaffoldError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let details = match err {
        ScaffoldError::Validation(errors) => errors.clone(),
        other => vec![other.to_string()],
    };
    (status, Json(json!({ "error": err.to_string(), "details": details }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn get_project(State(state): State<Arc<ServerState>>) -> Response {
    match project::probe(&state.root).await {
        Ok(probe) => Json(probe).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    answers: Answers,
    #[serde(default)]
    overwrite: bool,
}

async fn post_preview(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let probe = match project::probe(&state.root).await {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let config = match build_config(
        &req.answers,
        &probe.name,
        &probe.source_root,
        probe.orm,
        probe.datastore,
    ) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match pipeline::preview(&config, &probe).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn post_generate(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let Some(_guard) = InFlightGuard::claim(&state.in_flight) else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a generation is already in progress" })),
        )
            .into_response();
    };

    let probe = match project::probe(&state.root).await {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let config = match build_config(
        &req.answers,
        &probe.name,
        &probe.source_root,
        probe.orm,
        probe.datastore,
    ) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    match pipeline::generate(&config, &probe, req.overwrite, &state.progress).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(&e),
    }
}
