//! Model status and reload endpoints
//!
//! - GET /api/model: active artifact summary
//! - POST /api/model/reload: `{path?}` → load off to the side, swap atomically
//!
//! A failed reload leaves the previous model serving and is reported by
//! `/health` as `last_error` until the next successful load.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use callrisk_engine::ModelInfo;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReloadRequest {
    /// Artifact path or `file://` URI; defaults to the configured model path
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(flatten)]
    pub info: Option<ModelInfo>,
}

impl ModelStatus {
    fn from_info(info: Option<ModelInfo>) -> Self {
        Self {
            loaded: info.is_some(),
            info,
        }
    }
}

/// GET /api/model
pub async fn get_model(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(ModelStatus::from_info(state.model.info()))
}

/// POST /api/model/reload
pub async fn reload_model(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ModelStatus>> {
    let req = parse_reload_request(&body)?;
    let path = req.path.or_else(|| state.model_path.clone()).ok_or_else(|| {
        ApiError::BadRequest("no path given and no model path configured".to_string())
    })?;

    let model = Arc::clone(&state.model);
    let load_path = path.clone();
    let result = tokio::task::spawn_blocking(move || model.load_from(&load_path))
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {}", e)))?;

    match result {
        Ok(info) => {
            info!(version = %info.version, "Model reloaded from {}", path.display());
            state.clear_error().await;
            Ok(Json(ModelStatus::from_info(Some(info))))
        }
        Err(e) => {
            error!(error = %e, "Model reload from {} failed; keeping previous model", path.display());
            state
                .record_error(format!("reload from {} failed: {}", path.display(), e))
                .await;
            Err(e.into())
        }
    }
}

/// An empty body means "reload the configured path"; anything else must be
/// a valid `ReloadRequest`
fn parse_reload_request(body: &[u8]) -> ApiResult<ReloadRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReloadRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid reload request: {}", e)))
}

/// Build model management routes
pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/api/model", get(get_model))
        .route("/api/model/reload", post(reload_model))
}
