//! Operational action checklist
//!
//! POST /api/recommend: `{transcript, score}` → `{actions}`
//!
//! Actions are Dutch, ordered: two safety items, one score-band item,
//! weapon and self-harm items when those phrases occur, then two closing
//! checks.

use axum::{
    extract::rejection::JsonRejection,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::validate_transcript;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Band thresholds on the danger score
pub const HIGH_RISK: f64 = 0.7;
pub const MEDIUM_RISK: f64 = 0.4;

const WEAPON_TERMS: &[&str] = &["mes", "pistool", "geweer", "hamer", "fles", "machete", "bijl"];

const SELF_HARM_TERMS: &[&str] = &[
    "snijdt zichzelf",
    "zelfmoord",
    "ik doe mezelf pijn",
    "ik ga mezelf pijn doen",
    "ik ga mezelf iets aandoen",
];

const SAFETY_FIRST: &[&str] = &[
    "Beoordeel veiligheid ter plekke; houd veilige afstand en creëer perimeters.",
    "Maak contact op afstand (porto/telefoon), spreek rustig en duidelijk.",
];

const HIGH_RISK_ACTION: &str =
    "Stuur extra eenheid + ambulance stand-by; informeer ter plaatse over mogelijke escalatie.";
const MEDIUM_RISK_ACTION: &str =
    "Plan de-escalatie met twee-eenheden-benadering; ambulance op afroep.";
const LOW_RISK_ACTION: &str = "Voer rustige de-escalatie; monitor laagschalig maar alert.";

const WEAPON_ACTIONS: &[&str] = &[
    "Wapenprotocol: geen plotselinge bewegingen; Taser/pepperspray conform richtlijnen gereed.",
    "Vermijd binnentreden zonder overzicht; gebruik beschutting en licht/geluid aan/uit beleid.",
];

const SELF_HARM_ACTIONS: &[&str] = &[
    "Schakel crisisdienst/psycholance; focus op verbale de-escalatie en veiligheidsafspraken.",
    "Verwijder scherpe voorwerpen uit bereik zodra veilig mogelijk.",
];

const CLOSING_CHECKS: &[&str] = &[
    "Verifieer aanwezigheid van derden (kinderen/omstanders) en evacueer zo nodig.",
    "Vraag: middelengebruik, eerdere incidenten, medische/psychiatrische voorgeschiedenis, beschermingsmaatregelen.",
];

/// Risk band of a danger score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK {
            RiskBand::High
        } else if score >= MEDIUM_RISK {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

/// Checklist for a transcript and its score
pub fn recommend_actions(transcript: &str, score: f64) -> Vec<&'static str> {
    let lowered = transcript.to_lowercase();
    let has_weapon = WEAPON_TERMS.iter().any(|t| lowered.contains(t));
    let self_harm = SELF_HARM_TERMS.iter().any(|t| lowered.contains(t));

    let mut actions: Vec<&'static str> = SAFETY_FIRST.to_vec();
    actions.push(match RiskBand::from_score(score) {
        RiskBand::High => HIGH_RISK_ACTION,
        RiskBand::Medium => MEDIUM_RISK_ACTION,
        RiskBand::Low => LOW_RISK_ACTION,
    });
    if has_weapon {
        actions.extend_from_slice(WEAPON_ACTIONS);
    }
    if self_harm {
        actions.extend_from_slice(SELF_HARM_ACTIONS);
    }
    actions.extend_from_slice(CLOSING_CHECKS);
    actions
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub transcript: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub actions: Vec<String>,
}

/// POST /api/recommend
pub async fn recommend(
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> ApiResult<Json<RecommendResponse>> {
    let Json(req) = payload?;
    validate_transcript(&req.transcript)?;
    if !(0.0..=1.0).contains(&req.score) {
        return Err(ApiError::BadRequest(format!(
            "score must be between 0 and 1, got {}",
            req.score
        )));
    }

    let actions = recommend_actions(&req.transcript, req.score)
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(RecommendResponse { actions }))
}

/// Build recommendation routes
pub fn recommend_routes() -> Router<AppState> {
    Router::new().route("/api/recommend", post(recommend))
}
