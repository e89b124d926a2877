//! HTTP API handlers for callrisk-api

pub mod health;
pub mod model;
pub mod recommend;
pub mod scoring;

pub use health::health_routes;
pub use model::model_routes;
pub use recommend::recommend_routes;
pub use scoring::scoring_routes;

use crate::error::{ApiError, ApiResult};

/// Shortest accepted transcript, in characters
pub const MIN_TRANSCRIPT_CHARS: usize = 3;

/// Largest accepted `top_n`
pub const MAX_TOP_N: usize = 30;

pub(crate) fn validate_transcript(transcript: &str) -> ApiResult<()> {
    let chars = transcript.chars().count();
    if chars < MIN_TRANSCRIPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "transcript must be at least {} characters, got {}",
            MIN_TRANSCRIPT_CHARS, chars
        )));
    }
    Ok(())
}

pub(crate) fn validate_top_n(top_n: usize) -> ApiResult<()> {
    if !(1..=MAX_TOP_N).contains(&top_n) {
        return Err(ApiError::BadRequest(format!(
            "top_n must be between 1 and {}, got {}",
            MAX_TOP_N, top_n
        )));
    }
    Ok(())
}
