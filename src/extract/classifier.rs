//! Conversational vs. ambiguous routing heuristic.

use serde::{Deserialize, Serialize};

use super::text::{contains_phrase, normalized_words, padded};

const INTERROGATIVE_PREFIXES: &[&str] = &[
    "what", "why", "how", "who", "when", "where", "which", "can you", "could you", "would you",
    "will you", "do you", "did you", "are you", "is it", "is there", "should i", "am i",
];

const GREETING_PREFIXES: &[&str] = &[
    "hi", "hey", "hello", "yo", "hiya", "howdy", "sup", "good morning", "good afternoon",
    "good evening", "good night", "thanks", "thank you", "nudgy",
];

const EMOTIONAL_WORDS: &[&str] = &[
    "overwhelmed", "stressed", "anxious", "anxiety", "sad", "depressed", "lonely", "exhausted",
    "frustrated", "angry", "scared", "afraid", "worried", "hopeless", "upset", "panicking",
    "crying", "burned out", "burnt out", "can't cope", "cant cope", "hate myself", "give up",
];

/// Routing decision for input the pattern tier did not handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Route to chat; never extract tasks
    Conversational,

    /// Let the AI extraction tier decide
    Ambiguous,
}

/// Stateless conversation classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationClassifier;

impl ConversationClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Classification {
        if text.contains('?') {
            return Classification::Conversational;
        }

        let words = normalized_words(text);
        if words.is_empty() {
            return Classification::Ambiguous;
        }
        let joined = padded(&words);

        let starts_with = |prefix: &str| joined.starts_with(&format!(" {} ", prefix));

        if INTERROGATIVE_PREFIXES.iter().any(|p| starts_with(*p))
            || GREETING_PREFIXES.iter().any(|p| starts_with(*p))
            || EMOTIONAL_WORDS.iter().any(|w| contains_phrase(&joined, w))
        {
            Classification::Conversational
        } else {
            Classification::Ambiguous
        }
    }

    pub fn is_conversational(&self, text: &str) -> bool {
        self.classify(text) == Classification::Conversational
    }

    /// Whether the text contains any emotional/distress wording
    pub fn mentions_distress(&self, text: &str) -> bool {
        let joined = padded(&normalized_words(text));
        EMOTIONAL_WORDS.iter().any(|w| contains_phrase(&joined, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Classification {
        ConversationClassifier::new().classify(text)
    }

    #[test]
    fn test_question_mark_is_conversational() {
        assert_eq!(classify("buy milk?"), Classification::Conversational);
    }

    #[test]
    fn test_interrogative_and_greeting_prefixes() {
        assert_eq!(classify("what should I do today"), Classification::Conversational);
        assert_eq!(classify("Hey Nudgy"), Classification::Conversational);
        assert_eq!(classify("Good morning!"), Classification::Conversational);
        // "hi" must be a whole word
        assert_eq!(classify("hiking trip planning for june"), Classification::Ambiguous);
    }

    #[test]
    fn test_emotional_words() {
        assert_eq!(
            classify("I'm feeling really overwhelmed today"),
            Classification::Conversational
        );
        assert_eq!(classify("so burned out lately"), Classification::Conversational);
    }

    #[test]
    fn test_everything_else_is_ambiguous() {
        assert_eq!(
            classify("the car needs an oil change and the rent is due friday"),
            Classification::Ambiguous
        );
        assert_eq!(classify(""), Classification::Ambiguous);
    }
}
