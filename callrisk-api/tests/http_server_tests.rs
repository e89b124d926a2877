//! HTTP Server & Routing Integration Tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use callrisk_api::{build_router, AppState};
use callrisk_engine::{EngineConfig, LanguageConfig, ModelArtifact, ModelHandle};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const MODEL_JSON: &str = r#"{
    "version": "2026-10-01.1",
    "trained_at": "2026-10-01T12:00:00Z",
    "vectorizer": {
        "vocabulary": {"mes": 0, "bedreigt": 1, "sleutels": 2},
        "idf": [1.0, 1.0, 1.0],
        "ngram_range": [1, 2],
        "stop_words": ["hij", "een", "en", "mij"]
    },
    "regressor": {"kind": "linear", "coef": [0.5, 0.3, -0.2], "intercept": 0.1}
}"#;

fn heuristic_state() -> AppState {
    AppState::new(
        EngineConfig::default(),
        LanguageConfig::dutch(),
        Arc::new(ModelHandle::empty()),
    )
    .unwrap()
}

fn write_model(dir: &Path, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_without_model() {
    let app = build_router(heuristic_state());
    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "callrisk-api");
    assert_eq!(body["model_loaded"], false);
    assert!(body.get("model_version").is_none());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_health_reports_model_version() {
    let model = ModelArtifact::from_json_str(MODEL_JSON).unwrap();
    let state = AppState::new(
        EngineConfig::default(),
        LanguageConfig::dutch(),
        Arc::new(ModelHandle::with_model(model)),
    )
    .unwrap();
    let (_, body) = send(build_router(state), get("/health")).await;

    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_version"], "2026-10-01.1");
}

// ============================================================================
// Score
// ============================================================================

#[tokio::test]
async fn test_score_heuristic() {
    let app = build_router(heuristic_state());
    let (status, body) = send(
        app,
        post_json("/api/score", json!({"transcript": "Hij heeft een mes en bedreigt mij"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0.5);
}

#[tokio::test]
async fn test_score_rejects_short_transcript() {
    let app = build_router(heuristic_state());
    let (status, body) = send(app, post_json("/api/score", json!({"transcript": "ok"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_score_rejects_missing_field() {
    let app = build_router(heuristic_state());
    let (status, body) = send(app, post_json("/api/score", json!({"text": "abc"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_whitespace_transcript_scores_zero() {
    let app = build_router(heuristic_state());
    let (status, body) = send(app, post_json("/api/score", json!({"transcript": "     "}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0.0);
}

// ============================================================================
// Sensitivity / analyze
// ============================================================================

#[tokio::test]
async fn test_sensitivity_ranks_terms() {
    let app = build_router(heuristic_state());
    let (status, body) = send(
        app,
        post_json(
            "/api/sensitivity",
            json!({"transcript": "Hij heeft een mes en bedreigt mij", "top_n": 5}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"],
        json!([
            {"term": "mes", "delta": -0.3, "direction": "decrease"},
            {"term": "bedreigt", "delta": -0.2, "direction": "decrease"}
        ])
    );
}

#[tokio::test]
async fn test_sensitivity_top_n_bounds() {
    for top_n in [0, 31] {
        let app = build_router(heuristic_state());
        let (status, _) = send(
            app,
            post_json(
                "/api/sensitivity",
                json!({"transcript": "Hij heeft een mes", "top_n": top_n}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "top_n = {}", top_n);
    }
}

#[tokio::test]
async fn test_sensitivity_truncates() {
    let app = build_router(heuristic_state());
    let (_, body) = send(
        app,
        post_json(
            "/api/sensitivity",
            json!({"transcript": "Hij heeft een mes en bedreigt mij", "top_n": 1}),
        ),
    )
    .await;

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["term"], "mes");
}

#[tokio::test]
async fn test_analyze_combines_score_and_results() {
    let app = build_router(heuristic_state());
    let (status, body) = send(
        app,
        post_json(
            "/api/analyze",
            json!({"transcript": "Hij heeft een mes en bedreigt mij"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0.5);
    assert_eq!(body["results"][0]["term"], "mes");
}

#[tokio::test]
async fn test_analyze_harmless_transcript() {
    let app = build_router(heuristic_state());
    let (_, body) = send(
        app,
        post_json(
            "/api/analyze",
            json!({"transcript": "Ik heb mijn sleutels verloren"}),
        ),
    )
    .await;

    assert_eq!(body["score"], 0.0);
    assert_eq!(body["results"], json!([]));
}

// ============================================================================
// Recommend
// ============================================================================

#[tokio::test]
async fn test_recommend_weapon_checklist() {
    let app = build_router(heuristic_state());
    let (status, body) = send(
        app,
        post_json(
            "/api/recommend",
            json!({"transcript": "Hij heeft een mes", "score": 0.75}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let actions = body["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 7);
    assert!(actions[2].as_str().unwrap().starts_with("Stuur extra eenheid"));
    assert!(actions[3].as_str().unwrap().starts_with("Wapenprotocol"));
}

#[tokio::test]
async fn test_recommend_rejects_out_of_range_score() {
    let app = build_router(heuristic_state());
    let (status, _) = send(
        app,
        post_json(
            "/api/recommend",
            json!({"transcript": "Hij heeft een mes", "score": 1.5}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Model management
// ============================================================================

#[tokio::test]
async fn test_model_status_empty() {
    let app = build_router(heuristic_state());
    let (status, body) = send(app, get("/api/model")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"loaded": false}));
}

#[tokio::test]
async fn test_reload_swaps_model_and_scores_change() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_model(temp_dir.path(), "model.json", MODEL_JSON);
    let state = heuristic_state().with_model_path(Some(path));

    let (status, body) = send(
        build_router(state.clone()),
        Request::builder()
            .method("POST")
            .uri("/api/model/reload")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], true);
    assert_eq!(body["version"], "2026-10-01.1");
    assert_eq!(body["vocabulary_size"], 3);

    // "mes" alone: 0.1 + 0.5
    let (_, body) = send(
        build_router(state.clone()),
        post_json("/api/score", json!({"transcript": "Hij heeft een mes"})),
    )
    .await;
    assert_eq!(body["score"], 0.6);

    let (_, body) = send(build_router(state), get("/api/model")).await;
    assert_eq!(body["version"], "2026-10-01.1");
}

#[tokio::test]
async fn test_reload_with_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_model(temp_dir.path(), "next.json", MODEL_JSON);

    let (status, body) = send(
        build_router(heuristic_state()),
        post_json("/api/model/reload", json!({"path": path})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], true);
}

#[tokio::test]
async fn test_reload_without_any_path_is_bad_request() {
    let (status, _) = send(
        build_router(heuristic_state()),
        post_json("/api/model/reload", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reload_rejects_malformed_body() {
    let temp_dir = TempDir::new().unwrap();
    let configured = write_model(temp_dir.path(), "configured.json", MODEL_JSON);
    let state = heuristic_state().with_model_path(Some(configured));

    for body in [json!({"path": 42}), json!(["model.json"])] {
        let (status, response) = send(
            build_router(state.clone()),
            post_json("/api/model/reload", body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body = {}", body);
        assert_eq!(response["error"]["code"], "BAD_REQUEST");
    }

    // Nothing was swapped in
    let (_, body) = send(build_router(state), get("/api/model")).await;
    assert_eq!(body, json!({"loaded": false}));
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_model() {
    let temp_dir = TempDir::new().unwrap();
    let broken = write_model(temp_dir.path(), "broken.json", "{\"version\": \"half\"");
    let model = ModelArtifact::from_json_str(MODEL_JSON).unwrap();
    let state = AppState::new(
        EngineConfig::default(),
        LanguageConfig::dutch(),
        Arc::new(ModelHandle::with_model(model)),
    )
    .unwrap();

    let (status, body) = send(
        build_router(state.clone()),
        post_json("/api/model/reload", json!({"path": broken})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "MALFORMED_ARTIFACT");

    let (_, body) = send(build_router(state.clone()), get("/health")).await;
    assert_eq!(body["model_version"], "2026-10-01.1");
    assert!(body["last_error"].as_str().unwrap().contains("broken.json"));

    let (status, _) = send(
        build_router(state),
        post_json(
            "/api/model/reload",
            json!({"path": temp_dir.path().join("missing.json")}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_successful_reload_clears_last_error() {
    let temp_dir = TempDir::new().unwrap();
    let good = write_model(temp_dir.path(), "good.json", MODEL_JSON);
    let state = heuristic_state();
    state.record_error("earlier failure").await;

    let (status, _) = send(
        build_router(state.clone()),
        post_json("/api/model/reload", json!({"path": good})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(build_router(state), get("/health")).await;
    assert!(body.get("last_error").is_none());
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = send(build_router(heuristic_state()), get("/api/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
