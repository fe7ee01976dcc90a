//! Deterministic last-resort tier.
//!
//! When every model tier is down, the keyword extractor still turns the raw
//! utterance into one plainly labeled task, and chat falls back to a fixed
//! set of curated replies. Nothing here can fail.

use crate::domain::{CapturedTask, TaskSource};

use super::classifier::ConversationClassifier;
use super::text::{capitalize_first, infer_due_hint, infer_priority};

/// Label used when the input carries no usable text at all
pub const UNTITLED_TASK: &str = "Untitled task";

const SUPPORTIVE_REPLIES: &[&str] = &[
    "That sounds like a lot. Want to pick just one tiny thing to start with? 💙",
    "I hear you. Take a breath, you don't have to do everything right now. 🌿",
    "It's okay to feel this way. I'm here whenever you want to sort things out together. 🐧",
];

const GENERAL_REPLIES: &[&str] = &[
    "I'm a little offline right now, but I'm still here! Tell me something you need to do. 🐧",
    "My brain is buffering 😅 If you've got a task in mind, say it and I'll jot it down.",
    "Can't think too hard at the moment, but I can still capture tasks for you! 📝",
];

/// Keyword-based extractor that never comes back empty-handed
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// One task whose content is the raw utterance, whitespace collapsed
    /// and first letter capitalized. Priority and due cues still apply.
    pub fn extract(&self, text: &str) -> CapturedTask {
        let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let content = if trimmed.is_empty() {
            UNTITLED_TASK.to_string()
        } else {
            capitalize_first(&trimmed)
        };
        CapturedTask::new(content, TaskSource::Keyword)
            .with_priority(infer_priority(text))
            .with_due(infer_due_hint(text))
    }
}

/// Fixed reply used when no chat tier is reachable
pub fn curated_reply(text: &str) -> String {
    let classifier = ConversationClassifier::new();
    let pool = if classifier.mentions_distress(text) {
        SUPPORTIVE_REPLIES
    } else {
        GENERAL_REPLIES
    };
    pool[text.len() % pool.len()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKind, DueHint, Priority};

    #[test]
    fn test_raw_text_becomes_one_task() {
        let task = KeywordExtractor::new().extract("figure out the landlord situation");
        assert_eq!(task.content, "Figure out the landlord situation");
        assert_eq!(task.source, TaskSource::Keyword);
        assert_eq!(task.action_kind, ActionKind::None);
    }

    #[test]
    fn test_brain_dump_stays_whole() {
        let task = KeywordExtractor::new().extract("call the  bank tomorrow, buy milk and text Jake");
        assert_eq!(task.content, "Call the bank tomorrow, buy milk and text Jake");
        assert_eq!(task.due_hint, DueHint::Tomorrow);
    }

    #[test]
    fn test_priority_cues_apply() {
        let task = KeywordExtractor::new().extract("the electric bill is urgent");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_blank_input_is_labeled() {
        assert_eq!(KeywordExtractor::new().extract("   ").content, UNTITLED_TASK);
    }

    #[test]
    fn test_curated_reply_is_deterministic() {
        let a = curated_reply("I'm feeling overwhelmed");
        let b = curated_reply("I'm feeling overwhelmed");
        assert_eq!(a, b);
        assert!(SUPPORTIVE_REPLIES.contains(&a.as_str()));
        assert!(GENERAL_REPLIES.contains(&curated_reply("tell me a joke").as_str()));
    }
}
