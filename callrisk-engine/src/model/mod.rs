//! Model artifact: TF-IDF feature extractor + linear regressor
//!
//! The artifact is a JSON export of the offline training job's pipeline.
//! The engine only depends on its inference contract:
//! - `transform(text) -> sparse feature vector`
//! - `predict(features) -> raw score`
//!
//! # Format
//! ```json
//! {
//!   "version": "2026-10-01.1",
//!   "trained_at": "2026-10-01T12:00:00Z",
//!   "vectorizer": {
//!     "vocabulary": {"mes": 0, "met een": 1},
//!     "idf": [1.9, 2.3],
//!     "ngram_range": [1, 2],
//!     "stop_words": ["een"],
//!     "lowercase": true,
//!     "sublinear_tf": false,
//!     "norm": "l2"
//!   },
//!   "regressor": {"kind": "linear", "coef": [0.41, 0.12], "intercept": 0.18}
//! }
//! ```

pub mod handle;

pub use handle::ModelHandle;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::scoring::Deadline;

/// Two or more word characters, the training job's token rule
static FEATURE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w\w+\b").expect("feature token pattern is valid")
});

/// Windows processed between deadline checks
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Sparse feature vector: `(column, value)` pairs sorted by column
pub type SparseVector = Vec<(usize, f64)>;

/// Row normalization applied after idf weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// TF-IDF feature extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term → feature column
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
    #[serde(skip)]
    stop_set: HashSet<String>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

fn default_true() -> bool {
    true
}

impl TfidfVectorizer {
    /// Build from terms listed in column order
    pub fn new(
        terms: Vec<String>,
        idf: Vec<f64>,
        ngram_range: (usize, usize),
        stop_words: Vec<String>,
    ) -> Self {
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(col, term)| (term, col))
            .collect();
        let mut vectorizer = Self {
            vocabulary,
            idf,
            ngram_range,
            stop_words,
            lowercase: true,
            sublinear_tf: false,
            norm: Norm::L2,
            stop_set: HashSet::new(),
        };
        vectorizer.prepare();
        vectorizer
    }

    fn prepare(&mut self) {
        self.stop_set = self.stop_words.iter().map(|w| w.to_lowercase()).collect();
    }

    /// Number of feature columns
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::MalformedArtifact(format!(
                "ngram_range must satisfy 1 <= min <= max, got ({}, {})",
                min_n, max_n
            )));
        }
        if let Some((term, col)) = self
            .vocabulary
            .iter()
            .find(|(_, col)| **col >= self.idf.len())
        {
            return Err(Error::MalformedArtifact(format!(
                "vocabulary term '{}' maps to column {} but idf has {} entries",
                term,
                col,
                self.idf.len()
            )));
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            return Err(Error::MalformedArtifact("idf contains non-finite values".to_string()));
        }
        Ok(())
    }

    /// Map text to its TF-IDF feature vector
    pub fn transform(&self, text: &str, deadline: &Deadline) -> Result<SparseVector> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens: Vec<&str> = FEATURE_TOKEN_RE
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_set.contains(*t))
            .collect();

        let mut counts: HashMap<usize, f64> = HashMap::new();
        let (min_n, max_n) = self.ngram_range;
        let mut processed = 0usize;
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                processed += 1;
                if processed % DEADLINE_CHECK_INTERVAL == 0 {
                    deadline.check()?;
                }
                let gram = window.join(" ");
                if let Some(&col) = self.vocabulary.get(&gram) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }
        }
        deadline.check()?;

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.idf[col])
            })
            .collect();
        // Column order keeps floating-point summation deterministic
        features.sort_unstable_by_key(|(col, _)| *col);

        if self.norm == Norm::L2 {
            let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in features.iter_mut() {
                    *v /= norm;
                }
            }
        }
        Ok(features)
    }
}

/// Regressor head
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    /// `intercept + coef · features` (ridge regression export)
    Linear { coef: Vec<f64>, intercept: f64 },
}

impl Regressor {
    fn dimension(&self) -> usize {
        match self {
            Regressor::Linear { coef, .. } => coef.len(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Regressor::Linear { coef, intercept } => {
                if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
                    return Err(Error::MalformedArtifact(
                        "regressor contains non-finite values".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Raw (unclamped) prediction
    pub fn predict(&self, features: &[(usize, f64)]) -> Result<f64> {
        let raw = match self {
            Regressor::Linear { coef, intercept } => {
                let mut sum = *intercept;
                for &(col, value) in features {
                    let weight = coef.get(col).ok_or_else(|| {
                        Error::InferenceFailure(format!("feature column {} out of range", col))
                    })?;
                    sum += weight * value;
                }
                sum
            }
        };
        if !raw.is_finite() {
            return Err(Error::InferenceFailure(format!(
                "prediction is not finite: {}",
                raw
            )));
        }
        Ok(raw)
    }
}

/// Versioned scoring artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    pub vectorizer: TfidfVectorizer,
    pub regressor: Regressor,
    /// File the artifact was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Summary of an artifact for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    pub vocabulary_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ModelArtifact {
    /// Assemble and validate an in-memory artifact
    pub fn new(
        version: impl Into<String>,
        vectorizer: TfidfVectorizer,
        regressor: Regressor,
    ) -> Result<Self> {
        let mut artifact = Self {
            version: version.into(),
            trained_at: None,
            vectorizer,
            regressor,
            source: None,
        };
        artifact.vectorizer.prepare();
        artifact.validate()?;
        Ok(artifact)
    }

    /// Parse and validate a JSON export
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| Error::MalformedArtifact(format!("JSON parse error: {}", e)))?;
        artifact.vectorizer.prepare();
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read a JSON export from disk. `file://` URIs are accepted.
    pub fn load(path: &Path) -> Result<Self> {
        let path = strip_file_scheme(path);
        let content = std::fs::read_to_string(&path)?;
        let mut artifact = Self::from_json_str(&content)?;
        artifact.source = Some(path.clone());
        info!(
            version = %artifact.version,
            vocabulary = artifact.vectorizer.vocabulary.len(),
            "Loaded model artifact from {}",
            path.display()
        );
        Ok(artifact)
    }

    /// Shape and value checks
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::MalformedArtifact("version must not be empty".to_string()));
        }
        self.vectorizer.validate()?;
        self.regressor.validate()?;
        if self.vectorizer.dimension() != self.regressor.dimension() {
            return Err(Error::MalformedArtifact(format!(
                "vectorizer has {} columns but regressor expects {}",
                self.vectorizer.dimension(),
                self.regressor.dimension()
            )));
        }
        Ok(())
    }

    pub fn transform(&self, text: &str, deadline: &Deadline) -> Result<SparseVector> {
        self.vectorizer.transform(text, deadline)
    }

    pub fn predict(&self, features: &[(usize, f64)]) -> Result<f64> {
        self.regressor.predict(features)
    }

    /// Transform then predict; the result is not clamped
    pub fn infer(&self, text: &str, deadline: &Deadline) -> Result<f64> {
        let features = self.transform(text, deadline)?;
        deadline.check()?;
        self.predict(&features)
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            version: self.version.clone(),
            trained_at: self.trained_at,
            vocabulary_size: self.vectorizer.vocabulary.len(),
            source: self.source.clone(),
        }
    }
}

fn strip_file_scheme(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("file://")) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}
