//! Engine configuration
//!
//! Deserialized from the `[engine]` table of the service TOML file. Every
//! field has a built-in default, so a missing table or key is never fatal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scoring::strategy_names;

/// Tunables for scoring and attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ordered fallback chain, by strategy name
    pub strategies: Vec<String>,

    /// Maximum bigram candidates per transcript
    pub max_bigrams: usize,

    /// Attributions with `|delta|` below this are dropped
    pub min_impact: f64,

    /// Result count when a request does not specify one
    pub default_top_n: usize,

    /// Budget for a single strategy attempt
    pub scoring_timeout_ms: u64,

    /// Budget for one whole sensitivity run
    pub analysis_deadline_ms: u64,

    /// Concurrent perturb-and-score workers
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategies: vec!["learned".to_string(), "heuristic".to_string()],
            max_bigrams: 20,
            min_impact: 1e-4,
            default_top_n: 10,
            scoring_timeout_ms: 2_000,
            analysis_deadline_ms: 15_000,
            workers: 4,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(Error::Config("strategies must not be empty".to_string()));
        }
        let known = strategy_names();
        if let Some(unknown) = self.strategies.iter().find(|s| !known.contains(&s.as_str())) {
            return Err(Error::Config(format!(
                "unknown scoring strategy '{}' (known: {})",
                unknown,
                known.join(", ")
            )));
        }
        if !self.min_impact.is_finite() || self.min_impact < 0.0 {
            return Err(Error::Config(format!(
                "min_impact must be finite and >= 0, got {}",
                self.min_impact
            )));
        }
        if self.default_top_n == 0 {
            return Err(Error::Config("default_top_n must be >= 1".to_string()));
        }
        if self.scoring_timeout_ms == 0 {
            return Err(Error::Config("scoring_timeout_ms must be > 0".to_string()));
        }
        if self.analysis_deadline_ms == 0 {
            return Err(Error::Config("analysis_deadline_ms must be > 0".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be >= 1".to_string()));
        }
        Ok(())
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }

    pub fn analysis_deadline(&self) -> Duration {
        Duration::from_millis(self.analysis_deadline_ms)
    }
}
