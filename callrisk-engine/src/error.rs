//! Error types for the scoring and attribution engine
//!
//! Failures below the fallback chain and the per-candidate loop are
//! recovered locally; these values travel only between engine layers and
//! to the model reload path.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// No model artifact loaded; the chain advances to the next strategy
    #[error("Model unavailable: no artifact loaded")]
    ModelUnavailable,

    /// Transform or predict failed (includes panics and non-finite output)
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    /// A scoring call exceeded its budget
    #[error("Timeout: scoring exceeded {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },

    /// Artifact could not be parsed or failed shape validation
    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    /// Tokenization or candidate building failed
    #[error("Extraction failure: {0}")]
    ExtractionFailure(String),

    /// A single candidate's perturb-and-score step failed
    #[error("Candidate '{term}' could not be scored: {reason}")]
    CandidateScoring { term: String, reason: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
