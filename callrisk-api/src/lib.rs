//! callrisk-api library - HTTP boundary for the scoring engine
//!
//! Exposes scoring, sensitivity ranking, action recommendations and model
//! management over JSON. Scoring is CPU-bound and always runs on the
//! blocking pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::Router;
use callrisk_engine::{
    EngineConfig, LanguageConfig, ModelHandle, Result, ScoringService, SensitivityAnalyzer,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod config;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<ScoringService>,
    pub analyzer: Arc<SensitivityAnalyzer>,
    pub model: Arc<ModelHandle>,
    pub engine: Arc<EngineConfig>,
    /// Artifact reloaded when `/api/model/reload` names no path
    pub model_path: Option<PathBuf>,
    pub cors_origin: String,
    pub startup_time: Instant,
    /// Most recent model load failure, cleared by a successful load
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Build the scoring chain and analyzer over `model`
    pub fn new(
        engine: EngineConfig,
        language: LanguageConfig,
        model: Arc<ModelHandle>,
    ) -> Result<Self> {
        engine.validate()?;
        let scoring = Arc::new(ScoringService::from_config(
            &engine,
            &language,
            Arc::clone(&model),
        )?);
        let analyzer = Arc::new(SensitivityAnalyzer::from_config(
            &engine,
            language,
            Arc::clone(&scoring),
        ));
        Ok(Self {
            scoring,
            analyzer,
            model,
            engine: Arc::new(engine),
            model_path: None,
            cors_origin: "*".to_string(),
            startup_time: Instant::now(),
            last_error: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_model_path(mut self, path: Option<PathBuf>) -> Self {
        self.model_path = path;
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }

    pub async fn clear_error(&self) {
        *self.last_error.write().await = None;
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .merge(api::health_routes())
        .merge(api::scoring_routes())
        .merge(api::recommend_routes())
        .merge(api::model_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `*` allows any origin; anything else is a single allowed origin
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin '{}', allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}
