//! Keyword-weight scoring
//!
//! Sum of the weights of every configured term that occurs in the lowercased
//! transcript (substring match, each term counted once), capped at 1.0.

use super::{Deadline, Scorer, HEURISTIC};
use crate::error::Result;
use crate::language::{LanguageConfig, WeightedTerm};

pub struct HeuristicScorer {
    weights: Vec<WeightedTerm>,
}

impl HeuristicScorer {
    pub fn new(weights: Vec<WeightedTerm>) -> Self {
        let weights = weights
            .into_iter()
            .map(|w| WeightedTerm::new(w.term.to_lowercase(), w.weight))
            .collect();
        Self { weights }
    }

    pub fn from_language(language: &LanguageConfig) -> Self {
        Self::new(language.heuristic_weights.clone())
    }
}

impl Scorer for HeuristicScorer {
    fn name(&self) -> &'static str {
        HEURISTIC
    }

    fn score(&self, transcript: &str, _deadline: &Deadline) -> Result<f64> {
        let lowered = transcript.to_lowercase();
        let total: f64 = self
            .weights
            .iter()
            .filter(|w| lowered.contains(w.term.as_str()))
            .map(|w| w.weight)
            .sum();
        Ok(total.min(1.0))
    }
}
