//! Small text helpers shared by the extraction tiers.

use crate::domain::{DueHint, Priority};

const HIGH_PRIORITY_CUES: &[&str] = &["urgent", "urgently", "asap", "important", "right away", "critical"];

const LOW_PRIORITY_CUES: &[&str] = &[
    "maybe",
    "whenever",
    "someday",
    "at some point",
    "when i get a chance",
    "not urgent",
];

/// Strip leading/trailing punctuation from a single word
pub fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Lower-cased, punctuation-trimmed words; empty tokens dropped
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| trim_punctuation(w).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Join words with single spaces and pad both ends so phrase checks can use
/// `" phrase "` without matching inside other words.
pub fn padded(words: &[String]) -> String {
    format!(" {} ", words.join(" "))
}

/// Whole-word phrase containment against a `padded` string
pub fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}

/// Upper-case the first character, leave the rest untouched
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Priority from urgency cues. "not urgent" wins over "urgent".
pub fn infer_priority(text: &str) -> Priority {
    let words = padded(&normalized_words(text));

    if LOW_PRIORITY_CUES.iter().any(|cue| contains_phrase(&words, cue)) {
        Priority::Low
    } else if HIGH_PRIORITY_CUES.iter().any(|cue| contains_phrase(&words, cue)) {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Due hint from relative time words
pub fn infer_due_hint(text: &str) -> DueHint {
    let words = padded(&normalized_words(text));

    if contains_phrase(&words, "tomorrow") {
        DueHint::Tomorrow
    } else if contains_phrase(&words, "today") || contains_phrase(&words, "tonight") {
        DueHint::Today
    } else if contains_phrase(&words, "next week") {
        DueHint::NextWeek
    } else if contains_phrase(&words, "this week") || contains_phrase(&words, "this weekend") {
        DueHint::ThisWeek
    } else {
        DueHint::None
    }
}
