//! Whole-word term removal
//!
//! Every case-insensitive, word-bounded occurrence of a term is replaced by
//! a single space. Multi-word terms match their words separated by any run
//! of whitespace. Removal is idempotent, and two words on either side of a
//! removed term never merge into one token.

use regex::Regex;

use crate::error::{Error, Result};

/// Compiled matcher for one term
#[derive(Debug, Clone)]
pub struct TermRemover {
    term: String,
    re: Regex,
}

impl TermRemover {
    pub fn new(term: &str) -> Result<Self> {
        let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Err(Error::CandidateScoring {
                term: term.to_string(),
                reason: "empty term".to_string(),
            });
        }
        let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
        let re = Regex::new(&pattern).map_err(|e| Error::CandidateScoring {
            term: term.to_string(),
            reason: format!("pattern build failed: {}", e),
        })?;
        Ok(Self {
            term: term.to_string(),
            re,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Replace every occurrence with a single space
    pub fn apply(&self, transcript: &str) -> String {
        self.apply_counted(transcript).0
    }

    /// Removal result plus the number of occurrences removed
    ///
    /// A multi-word removal can join the words around it into a fresh
    /// match ("a a b b" minus "a b"), so passes repeat until none is left.
    /// Every pass removes at least one word, which bounds the loop.
    pub fn apply_counted(&self, transcript: &str) -> (String, usize) {
        let mut text = transcript.to_string();
        let mut removed = 0;
        loop {
            let found = self.re.find_iter(&text).count();
            if found == 0 {
                return (text, removed);
            }
            removed += found;
            text = self.re.replace_all(&text, " ").into_owned();
        }
    }

    /// Number of whole-word occurrences
    pub fn count_matches(&self, transcript: &str) -> usize {
        self.re.find_iter(transcript).count()
    }
}

/// Remove `term` from `transcript` (see module docs)
pub fn remove(transcript: &str, term: &str) -> Result<String> {
    Ok(TermRemover::new(term)?.apply(transcript))
}
