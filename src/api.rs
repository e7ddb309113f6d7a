// src/api.rs
// HTTP surface over the pipeline: /health, /watch (GET with query params or
// POST with a JSON body), and the Prometheus /metrics route when enabled.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::pipeline::{run, DigestRequest};
use crate::sources::types::Focus;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<AppConfig>,
}

pub fn create_router(cfg: AppConfig) -> Router {
    let state = AppState { cfg: Arc::new(cfg) };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/watch", get(watch_get).post(watch_post))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
pub struct WatchParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    focus: Option<String>,
    #[serde(default)]
    max_items: Option<usize>,
}

#[derive(serde::Serialize)]
struct WatchResp {
    markdown: String,
    stats: crate::report::DigestStats,
    warnings: Vec<String>,
}

#[derive(serde::Serialize)]
struct ErrorResp {
    error_kind: &'static str,
    message: String,
}

fn error_response(e: PipelineError) -> Response {
    let (status, kind) = match &e {
        PipelineError::AllSourcesFailed { .. } => (StatusCode::BAD_GATEWAY, "all_sources_failed"),
        PipelineError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        PipelineError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    error!(error = %e, "watch run failed");
    (
        status,
        Json(ErrorResp {
            error_kind: kind,
            message: e.to_string(),
        }),
    )
        .into_response()
}

async fn run_watch(state: AppState, params: WatchParams) -> Response {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| "Quoi de neuf en tech ?".to_string());
    let focus = params
        .focus
        .as_deref()
        .and_then(Focus::parse)
        .unwrap_or_default();
    let max_items = params
        .max_items
        .unwrap_or(state.cfg.max_items_per_source)
        .clamp(1, 50);

    let request = DigestRequest::new(&query, focus, max_items);
    match run(&state.cfg, &request).await {
        Ok(out) => Json(WatchResp {
            markdown: out.markdown,
            stats: out.report.stats,
            warnings: out.report.warnings,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn watch_get(State(state): State<AppState>, Query(params): Query<WatchParams>) -> Response {
    run_watch(state, params).await
}

async fn watch_post(State(state): State<AppState>, Json(params): Json<WatchParams>) -> Response {
    run_watch(state, params).await
}
