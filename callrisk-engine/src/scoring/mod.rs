//! Scoring strategies and the fallback chain
//!
//! A [`ScoringService`] maps a transcript to a [`ScoreValue`] by trying an
//! ordered list of [`Scorer`] strategies until one succeeds. Errors, panics,
//! timeouts and non-finite outputs inside a strategy advance the chain; no
//! failure escapes `score`. When every strategy fails the score is 0.0.

pub mod heuristic;
pub mod learned;

pub use heuristic::HeuristicScorer;
pub use learned::LearnedModelScorer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::language::LanguageConfig;
use crate::model::ModelHandle;
use crate::score::ScoreValue;

/// Strategy name for the learned model
pub const LEARNED: &str = "learned";

/// Strategy name for keyword weights
pub const HEURISTIC: &str = "heuristic";

/// Names accepted in `EngineConfig::strategies`
pub fn strategy_names() -> [&'static str; 2] {
    [LEARNED, HEURISTIC]
}

/// Cooperative time budget for one strategy attempt
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    budget_ms: u64,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
            budget_ms: budget.as_millis() as u64,
        }
    }

    /// No limit
    pub fn none() -> Self {
        Self {
            at: None,
            budget_ms: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.at.map(|at| Instant::now() >= at).unwrap_or(false)
    }

    /// `Err(Timeout)` once the budget is spent
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(Error::Timeout {
                budget_ms: self.budget_ms,
            })
        } else {
            Ok(())
        }
    }
}

/// Scoring strategy
///
/// Returns a raw score; the chain clamps it to [0, 1]. Long-running
/// strategies must poll `deadline` and return `Error::Timeout` when expired.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, transcript: &str, deadline: &Deadline) -> Result<f64>;
}

type ScoreFn = Box<dyn Fn(&str) -> Result<f64> + Send + Sync>;

/// Strategy backed by a closure
pub struct FnScorer {
    name: &'static str,
    score_fn: ScoreFn,
}

impl FnScorer {
    pub fn new(
        name: &'static str,
        score_fn: impl Fn(&str) -> Result<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            score_fn: Box::new(score_fn),
        }
    }
}

impl Scorer for FnScorer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, transcript: &str, _deadline: &Deadline) -> Result<f64> {
        (self.score_fn)(transcript)
    }
}

/// Successful chain result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub score: ScoreValue,
    /// Strategy that produced the score; `None` for empty input or an
    /// exhausted chain
    pub strategy: Option<&'static str>,
}

/// Ordered strategies tried until one succeeds
#[derive(Clone)]
pub struct FallbackChain {
    strategies: Vec<Arc<dyn Scorer>>,
}

impl FallbackChain {
    pub fn new(strategies: Vec<Arc<dyn Scorer>>) -> Self {
        Self { strategies }
    }

    /// Build from strategy names (see [`strategy_names`])
    pub fn from_names(
        names: &[String],
        language: &LanguageConfig,
        model: &Arc<ModelHandle>,
    ) -> Result<Self> {
        let strategies = names
            .iter()
            .map(|name| -> Result<Arc<dyn Scorer>> {
                match name.as_str() {
                    LEARNED => Ok(Arc::new(LearnedModelScorer::new(Arc::clone(model)))),
                    HEURISTIC => Ok(Arc::new(HeuristicScorer::from_language(language))),
                    other => Err(Error::Config(format!("unknown scoring strategy '{}'", other))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(strategies))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run strategies in order. Each attempt gets its own `budget`.
    pub fn execute(&self, transcript: &str, budget: Duration) -> Option<(f64, &'static str)> {
        for strategy in &self.strategies {
            let name = strategy.name();
            let deadline = Deadline::after(budget);
            let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                strategy.score(transcript, &deadline)
            }));
            match attempt {
                Ok(Ok(raw)) if raw.is_finite() => return Some((raw, name)),
                Ok(Ok(raw)) => {
                    warn!(strategy = name, raw, "Strategy returned non-finite score, falling back");
                }
                Ok(Err(Error::ModelUnavailable)) => {
                    debug!(strategy = name, "No model loaded, falling back");
                }
                Ok(Err(e)) => {
                    warn!(strategy = name, error = %e, "Strategy failed, falling back");
                }
                Err(_) => {
                    error!(strategy = name, "Strategy panicked, falling back");
                }
            }
        }
        None
    }
}

/// Transcript → danger score through the fallback chain
pub struct ScoringService {
    chain: FallbackChain,
    model: Arc<ModelHandle>,
    timeout: Duration,
}

impl ScoringService {
    pub fn new(chain: FallbackChain, model: Arc<ModelHandle>, timeout: Duration) -> Self {
        Self {
            chain,
            model,
            timeout,
        }
    }

    /// Chain from `config.strategies` over the given model handle
    pub fn from_config(
        config: &EngineConfig,
        language: &LanguageConfig,
        model: Arc<ModelHandle>,
    ) -> Result<Self> {
        let chain = FallbackChain::from_names(&config.strategies, language, &model)?;
        Ok(Self::new(chain, model, config.scoring_timeout()))
    }

    /// Score in [0, 1], four decimals. Never fails.
    pub fn score(&self, transcript: &str) -> ScoreValue {
        self.score_detailed(transcript).score
    }

    /// Score plus the strategy that produced it
    pub fn score_detailed(&self, transcript: &str) -> ScoreOutcome {
        if transcript.trim().is_empty() {
            return ScoreOutcome {
                score: ScoreValue::ZERO,
                strategy: None,
            };
        }
        match self.chain.execute(transcript, self.timeout) {
            Some((raw, name)) => ScoreOutcome {
                score: ScoreValue::new(raw),
                strategy: Some(name),
            },
            None => {
                warn!(
                    strategies = ?self.chain.names(),
                    "Every scoring strategy failed; returning 0.0"
                );
                ScoreOutcome {
                    score: ScoreValue::ZERO,
                    strategy: None,
                }
            }
        }
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_artifact;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(strategies: Vec<Arc<dyn Scorer>>) -> ScoringService {
        ScoringService::new(
            FallbackChain::new(strategies),
            Arc::new(ModelHandle::empty()),
            Duration::from_secs(1),
        )
    }

    fn fixed(name: &'static str, value: f64) -> Arc<dyn Scorer> {
        Arc::new(FnScorer::new(name, move |_| Ok(value)))
    }

    #[test]
    fn test_first_success_wins() {
        let svc = service(vec![fixed("a", 0.7), fixed("b", 0.1)]);
        let outcome = svc.score_detailed("er is iets aan de hand");
        assert_eq!(outcome.score.value(), 0.7);
        assert_eq!(outcome.strategy, Some("a"));
    }

    #[test]
    fn test_error_advances_chain() {
        let failing: Arc<dyn Scorer> = Arc::new(FnScorer::new("broken", |_| {
            Err(Error::InferenceFailure("boom".into()))
        }));
        let svc = service(vec![failing, fixed("backup", 0.4)]);
        assert_eq!(svc.score_detailed("tekst").strategy, Some("backup"));
    }

    #[test]
    fn test_panic_advances_chain() {
        let panicking: Arc<dyn Scorer> =
            Arc::new(FnScorer::new("panics", |_| panic!("inference exploded")));
        let svc = service(vec![panicking, fixed("backup", 0.4)]);
        assert_eq!(svc.score("tekst").value(), 0.4);
    }

    #[test]
    fn test_non_finite_advances_chain() {
        let svc = service(vec![fixed("nan", f64::NAN), fixed("backup", 0.3)]);
        assert_eq!(svc.score_detailed("tekst").strategy, Some("backup"));
    }

    #[test]
    fn test_output_clamped_and_rounded() {
        let svc = service(vec![fixed("big", 3.5)]);
        assert_eq!(svc.score("tekst").value(), 1.0);
        let svc = service(vec![fixed("precise", 0.123456789)]);
        assert_eq!(svc.score("tekst").value(), 0.1235);
    }

    #[test]
    fn test_exhausted_chain_returns_zero() {
        let failing: Arc<dyn Scorer> =
            Arc::new(FnScorer::new("broken", |_| Err(Error::ModelUnavailable)));
        let svc = service(vec![failing]);
        let outcome = svc.score_detailed("tekst");
        assert_eq!(outcome.score, ScoreValue::ZERO);
        assert_eq!(outcome.strategy, None);
    }

    #[test]
    fn test_empty_transcript_skips_strategies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting: Arc<dyn Scorer> = Arc::new(FnScorer::new("counting", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0.9)
        }));
        let svc = service(vec![counting]);
        assert_eq!(svc.score("").value(), 0.0);
        assert_eq!(svc.score("   \n\t").value(), 0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_without_model_uses_heuristic() {
        let svc = ScoringService::from_config(
            &EngineConfig::default(),
            &LanguageConfig::dutch(),
            Arc::new(ModelHandle::empty()),
        )
        .unwrap();
        assert_eq!(svc.chain().names(), vec![LEARNED, HEURISTIC]);
        let outcome = svc.score_detailed("Hij heeft een mes en bedreigt mij");
        assert_eq!(outcome.strategy, Some(HEURISTIC));
        assert_eq!(outcome.score.value(), 0.5);
    }

    #[test]
    fn test_from_config_with_model_uses_learned() {
        let svc = ScoringService::from_config(
            &EngineConfig::default(),
            &LanguageConfig::dutch(),
            Arc::new(ModelHandle::with_model(sample_artifact())),
        )
        .unwrap();
        let outcome = svc.score_detailed("Hij heeft een mes");
        assert_eq!(outcome.strategy, Some(LEARNED));
        // intercept 0.2 + 0.6 * 1.0 ("mes" is the only feature, normalized to 1)
        assert_eq!(outcome.score.value(), 0.8);
    }

    #[test]
    fn test_deterministic_repeated_calls() {
        let svc = ScoringService::from_config(
            &EngineConfig::default(),
            &LanguageConfig::dutch(),
            Arc::new(ModelHandle::with_model(sample_artifact())),
        )
        .unwrap();
        let text = "Hij staat met een mes bij zijn sleutels";
        let first = svc.score(text);
        for _ in 0..20 {
            assert_eq!(svc.score(text), first);
        }
    }
}
