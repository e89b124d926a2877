//! Perturbation-based sensitivity analysis
//!
//! Each candidate term is removed from the original transcript in isolation
//! and the transcript is rescored. The signed score change is the term's
//! attribution. Results are ranked by `|delta|` descending with ties kept in
//! extractor order, filtered by `min_impact`, then truncated to `top_n`.
//!
//! Two drivers share the same per-candidate step and ranking:
//! - [`SensitivityAnalyzer::run`] scores candidates one after another
//! - [`SensitivityAnalyzer::run_parallel`] fans candidates out over a
//!   bounded pool of blocking tasks
//!
//! Both stop at the overall deadline and rank whatever has completed.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidates::{CandidateExtractor, CandidateTerm};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::language::LanguageConfig;
use crate::perturbation;
use crate::score::{round_to, ScoreValue, DELTA_DECIMALS};
use crate::scoring::ScoringService;

/// Effect of removing a term on the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Score rose or stayed put after removal
    Increase,
    /// Score dropped after removal: the term was risk-increasing
    Decrease,
}

impl Direction {
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            Direction::Decrease
        } else {
            Direction::Increase
        }
    }
}

/// One ranked attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub term: String,
    /// `score(perturbed) - score(base)`, six decimals
    pub delta: f64,
    pub direction: Direction,
}

impl AttributionRecord {
    pub fn new(term: impl Into<String>, delta: f64) -> Self {
        let delta = round_to(delta, DELTA_DECIMALS);
        Self {
            term: term.into(),
            delta,
            direction: Direction::from_delta(delta),
        }
    }
}

/// Per-run knobs
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityOptions {
    pub top_n: usize,
    pub min_impact: f64,
    /// Overall budget; `None` runs every candidate
    pub deadline: Option<Duration>,
}

impl Default for SensitivityOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            min_impact: 1e-4,
            deadline: None,
        }
    }
}

impl SensitivityOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            top_n: config.default_top_n,
            min_impact: config.min_impact,
            deadline: Some(config.analysis_deadline()),
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// Measured candidate before ranking: extractor position, term, delta
type Measurement = (usize, String, f64);

pub struct SensitivityAnalyzer {
    scoring: Arc<ScoringService>,
    extractor: CandidateExtractor,
}

impl SensitivityAnalyzer {
    pub fn new(scoring: Arc<ScoringService>, extractor: CandidateExtractor) -> Self {
        Self { scoring, extractor }
    }

    pub fn from_config(
        config: &EngineConfig,
        language: LanguageConfig,
        scoring: Arc<ScoringService>,
    ) -> Self {
        Self::new(scoring, CandidateExtractor::new(language, config.max_bigrams))
    }

    pub fn scoring(&self) -> &Arc<ScoringService> {
        &self.scoring
    }

    pub fn extractor(&self) -> &CandidateExtractor {
        &self.extractor
    }

    /// Rank candidates, scoring them one at a time
    pub fn run(&self, transcript: &str, opts: &SensitivityOptions) -> Vec<AttributionRecord> {
        let started = Instant::now();
        let Some((base, candidates)) = self.prepare(transcript) else {
            return Vec::new();
        };
        let total = candidates.len();

        let mut measured: Vec<Measurement> = Vec::with_capacity(total);
        for (index, candidate) in candidates.iter().enumerate() {
            if opts.deadline.is_some_and(|d| started.elapsed() >= d) {
                warn!(
                    completed = measured.len(),
                    total,
                    "Sensitivity deadline reached, ranking partial results"
                );
                break;
            }
            let delta = self.measure(transcript, candidate, base);
            measured.push((index, candidate.text.clone(), delta));
        }

        let results = rank(measured, opts);
        info!(
            candidates = total,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sensitivity analysis complete"
        );
        results
    }

    /// Rank candidates on at most `workers` concurrent blocking tasks
    ///
    /// Completion order never leaks into the output; ranking restores the
    /// deterministic order. Blocking tasks still running at the deadline are
    /// not cancelled: they finish in the background and their results are
    /// discarded.
    pub async fn run_parallel(
        self: &Arc<Self>,
        transcript: &str,
        opts: &SensitivityOptions,
        workers: usize,
    ) -> Vec<AttributionRecord> {
        let started = tokio::time::Instant::now();
        if transcript.trim().is_empty() {
            return Vec::new();
        }
        let text: Arc<str> = Arc::from(transcript);

        let this = Arc::clone(self);
        let prep_text = Arc::clone(&text);
        let prepared = match tokio::task::spawn_blocking(move || this.prepare(&prep_text)).await {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Base scoring task failed");
                return Vec::new();
            }
        };
        let (base, candidates) = prepared;
        let total = candidates.len();

        let mut pending = stream::iter(candidates.into_iter().enumerate())
            .map(|(index, candidate)| {
                let this = Arc::clone(self);
                let text = Arc::clone(&text);
                async move {
                    let term = candidate.text.clone();
                    let delta = tokio::task::spawn_blocking(move || {
                        this.measure(&text, &candidate, base)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        warn!(term = %term, error = %e, "Candidate task failed, dropping");
                        0.0
                    });
                    (index, term, delta)
                }
            })
            .buffer_unordered(workers.max(1));

        let mut measured: Vec<Measurement> = Vec::with_capacity(total);
        let collect = async {
            while let Some(item) = pending.next().await {
                measured.push(item);
            }
        };
        match opts.deadline {
            Some(budget) => {
                if tokio::time::timeout_at(started + budget, collect).await.is_err() {
                    warn!(
                        completed = measured.len(),
                        total,
                        "Sensitivity deadline reached, ranking partial results"
                    );
                }
            }
            None => collect.await,
        }

        let results = rank(measured, opts);
        info!(
            candidates = total,
            results = results.len(),
            workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Parallel sensitivity analysis complete"
        );
        results
    }

    /// Base score and candidate list, or `None` when there is nothing to rank
    fn prepare(&self, transcript: &str) -> Option<(ScoreValue, Vec<CandidateTerm>)> {
        if transcript.trim().is_empty() {
            return None;
        }
        let base = self.scoring.score(transcript);
        let candidates = self.extractor.extract_or_lexicon(transcript);
        if candidates.is_empty() {
            debug!("No candidate terms, skipping attribution");
            return None;
        }
        debug!(base = %base, candidates = candidates.len(), "Attribution prepared");
        Some((base, candidates))
    }

    /// Delta for one candidate; any failure counts as no impact
    fn measure(&self, transcript: &str, candidate: &CandidateTerm, base: ScoreValue) -> f64 {
        let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.try_measure(transcript, candidate, base)
        }));
        match attempt {
            Ok(Ok(delta)) => delta,
            Ok(Err(e)) => {
                warn!(term = %candidate.text, error = %e, "Candidate dropped");
                0.0
            }
            Err(_) => {
                let e = Error::CandidateScoring {
                    term: candidate.text.clone(),
                    reason: "panicked".to_string(),
                };
                warn!(error = %e, "Candidate dropped");
                0.0
            }
        }
    }

    fn try_measure(
        &self,
        transcript: &str,
        candidate: &CandidateTerm,
        base: ScoreValue,
    ) -> Result<f64> {
        let modified = perturbation::remove(transcript, &candidate.text)?;
        let perturbed = self.scoring.score(&modified);
        Ok(round_to(perturbed.value() - base.value(), DELTA_DECIMALS))
    }
}

/// Threshold, stable sort by `|delta|` descending, truncate
fn rank(mut measured: Vec<Measurement>, opts: &SensitivityOptions) -> Vec<AttributionRecord> {
    measured.retain(|(_, _, delta)| delta.abs() >= opts.min_impact && delta.abs() > 0.0);
    measured.sort_by(|a, b| {
        b.2.abs()
            .partial_cmp(&a.2.abs())
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    measured.truncate(opts.top_n);
    measured
        .into_iter()
        .map(|(_, term, delta)| AttributionRecord::new(term, delta))
        .collect()
}
