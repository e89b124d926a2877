//! Language configuration: stopwords, curated risk lexicon, heuristic weights
//!
//! The built-in set is Dutch. Other languages load from a TOML file with the
//! same shape:
//!
//! ```toml
//! name = "nl"
//! token_pattern = '\p{L}+'
//! stopwords = ["de", "en", "van"]
//! risk_lexicon = ["met een mes", "mes"]
//!
//! [[heuristic_weights]]
//! term = "mes"
//! weight = 0.3
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Letters only, accented characters included
pub const DEFAULT_TOKEN_PATTERN: &str = r"\p{L}+";

/// Keyword with its heuristic weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

impl WeightedTerm {
    pub fn new(term: impl Into<String>, weight: f64) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

/// Language-specific term sets consumed by extraction and heuristic scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language tag (e.g., "nl")
    pub name: String,

    /// Word pattern used for tokenization
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,

    /// Tokens dropped before candidate building
    #[serde(default)]
    pub stopwords: Vec<String>,

    /// Curated risk terms, in declaration order
    #[serde(default)]
    pub risk_lexicon: Vec<String>,

    /// Keyword weights for the heuristic strategy, in declaration order
    #[serde(default)]
    pub heuristic_weights: Vec<WeightedTerm>,
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

const DUTCH_STOPWORDS: &[&str] = &[
    "de", "en", "van", "ik", "te", "dat", "die", "in", "een", "hij", "het", "niet", "zijn",
    "is", "was", "op", "aan", "met", "als", "voor", "had", "er", "maar", "om", "hem", "dan",
    "zou", "of", "wat", "mijn", "men", "dit", "zo", "door", "over", "ze", "zich", "bij", "ook",
    "tot", "je", "mij", "uit", "der", "daar", "haar", "naar", "heb", "hoe", "heeft", "hebben",
    "deze", "u", "want", "nog", "zal", "me", "zij", "nu", "ge", "geen", "omdat", "iets",
    "worden", "toch", "al", "waren", "veel", "meer", "doen", "toen", "moet", "ben", "zonder",
    "kan", "hun", "dus", "alles", "onder", "ja", "eens", "hier", "wie", "werd", "altijd",
    "doch", "wordt", "wezen", "kunnen", "ons", "zelf", "tegen", "na", "reeds", "wil", "kon",
    "niets", "uw", "iemand", "geweest", "andere",
];

const DUTCH_RISK_LEXICON: &[&str] = &[
    "met een mes", "mes", "pistool", "geweer", "wapen", "bijl", "bedreigt",
    "bedreigt iedereen", "bedreiging", "vermoorden", "steekt", "snijdt", "gesneden", "bloed",
    "slaat", "sloeg", "geweld", "in brand", "zelfmoord", "gewond", "agressief", "paniek",
    "bang",
];

// Substring matched: no entry may contain another entry, or a single
// mention would be counted twice.
const DUTCH_HEURISTIC_WEIGHTS: &[(&str, f64)] = &[
    ("mes", 0.3),
    ("bedreigt", 0.2),
    ("pistool", 0.4),
    ("geweer", 0.4),
    ("wapen", 0.3),
    ("bijl", 0.3),
    ("vermoorden", 0.4),
    ("zelfmoord", 0.4),
    ("steekt", 0.3),
    ("snijdt", 0.25),
    ("gesneden", 0.25),
    ("bloed", 0.2),
    ("slaat", 0.2),
    ("sloeg", 0.2),
    ("geweld", 0.2),
    ("in brand", 0.2),
    ("gewond", 0.15),
    ("agressief", 0.15),
    ("paniek", 0.1),
    ("bang", 0.1),
    ("politie", 0.05),
];

impl LanguageConfig {
    /// Built-in Dutch set
    pub fn dutch() -> Self {
        Self {
            name: "nl".to_string(),
            token_pattern: default_token_pattern(),
            stopwords: DUTCH_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            risk_lexicon: DUTCH_RISK_LEXICON.iter().map(|s| s.to_string()).collect(),
            heuristic_weights: DUTCH_HEURISTIC_WEIGHTS
                .iter()
                .map(|(term, weight)| WeightedTerm::new(*term, *weight))
                .collect(),
        }
    }

    /// Parse from a TOML string, then normalize and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LanguageConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse language TOML failed: {}", e)))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read language file {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            language = %config.name,
            stopwords = config.stopwords.len(),
            lexicon = config.risk_lexicon.len(),
            "Loaded language configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// Lowercase and trim every term, dropping empties and duplicates
    /// while keeping declaration order.
    pub fn normalized(mut self) -> Self {
        self.stopwords = dedupe_lowercase(self.stopwords);
        self.risk_lexicon = dedupe_lowercase(self.risk_lexicon);

        let mut seen = HashSet::new();
        self.heuristic_weights = self
            .heuristic_weights
            .into_iter()
            .filter_map(|w| {
                let term = w.term.trim().to_lowercase();
                if term.is_empty() || !seen.insert(term.clone()) {
                    None
                } else {
                    Some(WeightedTerm::new(term, w.weight))
                }
            })
            .collect();
        self
    }

    /// Validate term sets
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("language name must not be empty".to_string()));
        }
        if self.token_pattern.is_empty() {
            return Err(Error::Config("token_pattern must not be empty".to_string()));
        }
        for w in &self.heuristic_weights {
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(Error::Config(format!(
                    "heuristic weight for '{}' must be finite and >= 0, got {}",
                    w.term, w.weight
                )));
            }
        }
        Ok(())
    }

    /// Stopwords as a lookup set
    pub fn stopword_set(&self) -> HashSet<String> {
        self.stopwords.iter().cloned().collect()
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::dutch()
    }
}

fn dedupe_lowercase(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
