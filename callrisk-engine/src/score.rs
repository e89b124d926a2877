//! Score value type
//!
//! Every surfaced danger score passes through [`ScoreValue`], which clamps
//! to [0, 1] (NaN maps to 0.0, infinities to the nearest bound) and rounds
//! to four decimal places.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decimal places kept on surfaced scores
pub const SCORE_DECIMALS: i32 = 4;

/// Decimal places kept on attribution deltas
pub const DELTA_DECIMALS: i32 = 6;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to the nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Round half away from zero to `decimals` places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // -0.0 would serialize as "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Danger score in [0, 1], rounded to [`SCORE_DECIMALS`] places
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreValue(f64);

impl ScoreValue {
    pub const ZERO: ScoreValue = ScoreValue(0.0);

    /// Clamp and round a raw strategy output
    pub fn new(raw: f64) -> Self {
        Self(round_to(clamp_score(raw, 0.0, 1.0), SCORE_DECIMALS))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<ScoreValue> for f64 {
    fn from(score: ScoreValue) -> f64 {
        score.0
    }
}

impl std::fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
