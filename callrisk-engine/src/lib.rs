//! # callrisk-engine
//!
//! Danger scoring and term attribution for emergency-call transcripts:
//! - Score values constrained to [0, 1] (`score`)
//! - Language sets: stopwords, risk lexicon, heuristic weights (`language`)
//! - Candidate term extraction (`candidates`)
//! - Whole-word term removal (`perturbation`)
//! - Versioned model artifact + atomic swap handle (`model`)
//! - Ordered fallback chain of scoring strategies (`scoring`)
//! - Perturbation-based sensitivity ranking (`sensitivity`)

pub mod candidates;
pub mod config;
pub mod error;
pub mod language;
pub mod model;
pub mod perturbation;
pub mod score;
pub mod scoring;
pub mod sensitivity;

pub use candidates::{CandidateExtractor, CandidateOrigin, CandidateTerm};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use language::{LanguageConfig, WeightedTerm};
pub use model::{ModelArtifact, ModelHandle, ModelInfo};
pub use score::ScoreValue;
pub use scoring::{Deadline, FallbackChain, Scorer, ScoringService};
pub use sensitivity::{AttributionRecord, Direction, SensitivityAnalyzer, SensitivityOptions};
