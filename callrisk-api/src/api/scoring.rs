//! Score, sensitivity and analyze endpoints
//!
//! - POST /api/score: `{transcript}` → `{score}`
//! - POST /api/sensitivity: `{transcript, top_n?}` → `{results}`
//! - POST /api/analyze: `{transcript, top_n?}` → `{score, results}`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use callrisk_engine::{AttributionRecord, ScoreValue, SensitivityOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{validate_top_n, validate_transcript};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: ScoreValue,
}

/// Body for sensitivity and analyze; `top_n` falls back to the engine default
#[derive(Debug, Deserialize)]
pub struct SensitivityRequest {
    pub transcript: String,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensitivityResponse {
    pub results: Vec<AttributionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub score: ScoreValue,
    pub results: Vec<AttributionRecord>,
}

/// POST /api/score
pub async fn score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Json<ScoreResponse>> {
    let Json(req) = payload?;
    validate_transcript(&req.transcript)?;

    let score = score_blocking(&state, req.transcript).await?;
    Ok(Json(ScoreResponse { score }))
}

/// POST /api/sensitivity
pub async fn sensitivity(
    State(state): State<AppState>,
    payload: Result<Json<SensitivityRequest>, JsonRejection>,
) -> ApiResult<Json<SensitivityResponse>> {
    let Json(req) = payload?;
    let opts = options_for(&state, &req)?;

    let results = state
        .analyzer
        .run_parallel(&req.transcript, &opts, state.engine.workers)
        .await;
    Ok(Json(SensitivityResponse { results }))
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<SensitivityRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(req) = payload?;
    let opts = options_for(&state, &req)?;

    let (score, results) = tokio::join!(
        score_blocking(&state, req.transcript.clone()),
        state
            .analyzer
            .run_parallel(&req.transcript, &opts, state.engine.workers),
    );
    let score = score?;
    debug!(score = %score, results = results.len(), "Analyze complete");
    Ok(Json(AnalyzeResponse { score, results }))
}

fn options_for(state: &AppState, req: &SensitivityRequest) -> ApiResult<SensitivityOptions> {
    validate_transcript(&req.transcript)?;
    let top_n = req.top_n.unwrap_or(state.engine.default_top_n);
    validate_top_n(top_n)?;
    Ok(SensitivityOptions::from_config(&state.engine).with_top_n(top_n))
}

async fn score_blocking(state: &AppState, transcript: String) -> ApiResult<ScoreValue> {
    let scoring = Arc::clone(&state.scoring);
    tokio::task::spawn_blocking(move || scoring.score(&transcript))
        .await
        .map_err(|e| ApiError::Internal(format!("scoring task failed: {}", e)))
}

/// Build scoring routes
pub fn scoring_routes() -> Router<AppState> {
    Router::new()
        .route("/api/score", post(score))
        .route("/api/sensitivity", post(sensitivity))
        .route("/api/analyze", post(analyze))
}
