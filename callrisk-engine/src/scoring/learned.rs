//! Learned-model scoring
//!
//! Scores against whichever artifact the [`ModelHandle`] holds at call time.
//! The snapshot is taken once per call, so a concurrent swap never mixes two
//! models inside one score.

use std::sync::Arc;

use super::{Deadline, Scorer, LEARNED};
use crate::error::{Error, Result};
use crate::model::ModelHandle;
use crate::score::clamp_score;

pub struct LearnedModelScorer {
    model: Arc<ModelHandle>,
}

impl LearnedModelScorer {
    pub fn new(model: Arc<ModelHandle>) -> Self {
        Self { model }
    }
}

impl Scorer for LearnedModelScorer {
    fn name(&self) -> &'static str {
        LEARNED
    }

    fn score(&self, transcript: &str, deadline: &Deadline) -> Result<f64> {
        let model = self.model.get().ok_or(Error::ModelUnavailable)?;
        let raw = model.infer(transcript, deadline)?;
        Ok(clamp_score(raw, 0.0, 1.0))
    }
}
