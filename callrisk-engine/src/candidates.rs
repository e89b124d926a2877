//! Candidate term extraction
//!
//! Derives the ordered, duplicate-free set of terms whose removal is tested
//! by the sensitivity analyzer:
//! 1. Unigrams: unique filtered tokens, first-seen order
//! 2. Bigrams: adjacent filtered-token pairs, deduplicated, capped, and kept
//!    only when the pair occurs literally in the lowercased transcript
//! 3. Lexicon extras: risk lexicon terms present in the transcript and not
//!    already produced above, in declaration order

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::language::LanguageConfig;

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateOrigin {
    /// Unigram or bigram taken from the transcript itself
    #[serde(rename = "corpus-derived")]
    Corpus,
    /// Curated risk lexicon entry found in the transcript
    #[serde(rename = "lexicon")]
    Lexicon,
}

/// Term considered for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTerm {
    /// Lowercased term text (words separated by single spaces)
    pub text: String,
    pub origin: CandidateOrigin,
}

impl CandidateTerm {
    pub fn corpus(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: CandidateOrigin::Corpus,
        }
    }

    pub fn lexicon(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: CandidateOrigin::Lexicon,
        }
    }

    /// Number of whitespace-separated words in the term
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Builds candidate sets for one language configuration
pub struct CandidateExtractor {
    language: LanguageConfig,
    stopwords: HashSet<String>,
    /// Compile error is kept so extraction can report it per call
    token_re: std::result::Result<Regex, String>,
    max_bigrams: usize,
}

impl CandidateExtractor {
    /// Create extractor. An invalid token pattern does not fail construction;
    /// `extract` reports it and callers degrade to lexicon-only candidates.
    pub fn new(language: LanguageConfig, max_bigrams: usize) -> Self {
        let token_re = Regex::new(&language.token_pattern).map_err(|e| {
            error!(
                pattern = %language.token_pattern,
                error = %e,
                "Invalid token pattern; corpus candidates disabled"
            );
            e.to_string()
        });
        let stopwords = language.stopword_set();
        Self {
            language,
            stopwords,
            token_re,
            max_bigrams,
        }
    }

    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }

    /// Lowercased tokens with stopwords removed, in transcript order
    pub fn tokenize(&self, transcript: &str) -> Result<Vec<String>> {
        let re = self
            .token_re
            .as_ref()
            .map_err(|e| Error::ExtractionFailure(format!("token pattern: {}", e)))?;
        let lowered = transcript.to_lowercase();
        Ok(re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stopwords.contains(*t))
            .map(str::to_string)
            .collect())
    }

    /// Full candidate set: unigrams, then bigrams, then lexicon extras
    pub fn extract(&self, transcript: &str) -> Result<Vec<CandidateTerm>> {
        let tokens = self.tokenize(transcript)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let lowered = transcript.to_lowercase();

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for token in &tokens {
            if seen.insert(token.clone()) {
                candidates.push(CandidateTerm::corpus(token.clone()));
            }
        }

        let mut bigram_seen: HashSet<String> = HashSet::new();
        let bigrams: Vec<String> = tokens
            .windows(2)
            .map(|pair| format!("{} {}", pair[0], pair[1]))
            .filter(|bigram| bigram_seen.insert(bigram.clone()))
            .take(self.max_bigrams)
            .collect();
        for bigram in bigrams {
            // Pairs joined across a removed stopword never occur verbatim
            if lowered.contains(bigram.as_str()) && seen.insert(bigram.clone()) {
                candidates.push(CandidateTerm::corpus(bigram));
            }
        }

        candidates.extend(self.lexicon_matches(&lowered, &seen));

        debug!(
            tokens = tokens.len(),
            candidates = candidates.len(),
            "Candidate extraction complete"
        );
        Ok(candidates)
    }

    /// Lexicon terms present in the transcript, ignoring corpus candidates
    pub fn lexicon_candidates(&self, transcript: &str) -> Vec<CandidateTerm> {
        self.lexicon_matches(&transcript.to_lowercase(), &HashSet::new())
    }

    /// Full extraction, degrading to lexicon-only candidates on failure
    pub fn extract_or_lexicon(&self, transcript: &str) -> Vec<CandidateTerm> {
        match self.extract(transcript) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Candidate extraction failed, using lexicon terms only");
                self.lexicon_candidates(transcript)
            }
        }
    }

    fn lexicon_matches(&self, lowered: &str, exclude: &HashSet<String>) -> Vec<CandidateTerm> {
        self.language
            .risk_lexicon
            .iter()
            .filter(|term| lowered.contains(term.as_str()) && !exclude.contains(*term))
            .map(|term| CandidateTerm::lexicon(term.clone()))
            .collect()
    }
}
