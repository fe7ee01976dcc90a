//! Fuzzy duplicate detection against existing open tasks.
//!
//! Overlap is the size of the token-set intersection divided by the size of
//! the smaller set, after lower-casing and stop-word removal. No stemming or
//! synonym matching.

use std::collections::HashSet;

use crate::domain::CapturedTask;

use super::text::normalized_words;

/// Default overlap ratio at which a candidate is flagged
pub const DEFAULT_THRESHOLD: f64 = 0.7;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "from", "for", "of", "at", "in", "on", "my", "our", "your", "and",
    "or", "with", "some", "up", "about", "i", "me", "it", "is", "be", "this", "that", "need",
    "please",
];

/// Stateless duplicate detector
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    threshold: f64,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return a copy of `candidate` with `possible_duplicate` set when it
    /// overlaps any of `existing` at or above the threshold.
    pub fn flag_duplicates<I, S>(&self, candidate: &CapturedTask, existing: I) -> CapturedTask
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = token_set(&candidate.content);
        let duplicate = !tokens.is_empty()
            && existing
                .into_iter()
                .any(|other| overlap(&tokens, &token_set(other.as_ref())) >= self.threshold);

        let mut flagged = candidate.clone();
        flagged.possible_duplicate = duplicate;
        flagged
    }

    /// Overlap ratio between two free-text task descriptions
    pub fn overlap_ratio(&self, a: &str, b: &str) -> f64 {
        overlap(&token_set(a), &token_set(b))
    }
}

fn token_set(text: &str) -> HashSet<String> {
    normalized_words(text)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}
