//! Instant verb-prefix extraction.
//!
//! The pattern tier handles short commands ("call mom", "buy milk") without
//! any network round trip. It is pure and synchronous; when nothing matches
//! it returns `None` and the session moves on to the next tier.

use crate::domain::{ActionKind, CapturedTask, TaskSource};

use super::text::{capitalize_first, infer_due_hint, infer_priority, trim_punctuation};

/// Inputs outside this word range are left to the AI tiers
pub const MIN_WORDS: usize = 2;
pub const MAX_WORDS: usize = 12;

/// Content used when a link arrives with no surrounding text
pub const OPEN_LINK_LABEL: &str = "Open link";

/// Longest contact name taken after a contact verb
const MAX_CONTACT_WORDS: usize = 3;

const CONTACT_VERBS: &[(&[&str], ActionKind)] = &[
    (&["call"], ActionKind::Call),
    (&["ring"], ActionKind::Call),
    (&["phone"], ActionKind::Call),
    (&["text"], ActionKind::Text),
    (&["message"], ActionKind::Text),
    (&["msg"], ActionKind::Text),
    (&["email"], ActionKind::Email),
    (&["e-mail"], ActionKind::Email),
];

// Longer prefixes first: "search for" must win over "search".
const RICH_VERBS: &[(&[&str], ActionKind)] = &[
    (&["navigate", "to"], ActionKind::Navigate),
    (&["directions", "to"], ActionKind::Navigate),
    (&["drive", "to"], ActionKind::Navigate),
    (&["search", "for"], ActionKind::Search),
    (&["search"], ActionKind::Search),
    (&["look", "up"], ActionKind::Search),
    (&["google"], ActionKind::Search),
    (&["schedule"], ActionKind::Calendar),
    (&["book"], ActionKind::Calendar),
];

const TASK_VERBS: &[&[&str]] = &[
    &["remind", "me"],
    &["don't", "forget"],
    &["dont", "forget"],
    &["remember", "to"],
    &["i", "need", "to"],
    &["i", "have", "to"],
    &["need", "to"],
    &["have", "to"],
    &["gotta"],
    &["pick", "up"],
    &["drop", "off"],
    &["take", "out"],
    &["buy"],
    &["get"],
    &["grab"],
    &["clean"],
    &["wash"],
    &["pay"],
    &["fix"],
    &["finish"],
    &["submit"],
    &["send"],
    &["write"],
    &["read"],
    &["cook"],
    &["make"],
    &["order"],
    &["return"],
    &["renew"],
    &["cancel"],
    &["water"],
    &["walk"],
    &["mow"],
    &["check"],
    &["print"],
    &["sign"],
    &["file"],
    &["study"],
    &["prepare"],
    &["plan"],
    &["organize"],
    &["vacuum"],
];

/// Words that end a contact name ("call mom *tomorrow*", "text Sam *about* rent")
const CONTACT_STOP_WORDS: &[&str] = &[
    "about", "after", "again", "and", "asap", "at", "back", "before", "by", "for", "from", "if",
    "in", "later", "now", "on", "please", "re", "regarding", "so", "soon", "that", "then", "to",
    "today", "tomorrow", "tonight", "urgent", "when", "this", "next", "with", "morning",
    "afternoon", "evening", "week", "weekend", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday",
];

/// Leading words skipped before a contact name ("call *my* mom")
const CONTACT_LEADING: &[&str] = &["my", "the", "our"];

/// Rule-based extractor for short commands
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Try to turn a short utterance into a task without any I/O.
    pub fn try_extract(&self, text: &str) -> Option<CapturedTask> {
        let original: Vec<&str> = text.split_whitespace().collect();
        if original.len() < MIN_WORDS || original.len() > MAX_WORDS {
            return None;
        }
        let lower: Vec<String> = original.iter().map(|w| w.to_lowercase()).collect();

        let task = Self::match_url(&original, &lower)
            .or_else(|| Self::match_contact_verb(&original, &lower))
            .or_else(|| Self::match_rich_verb(&original, &lower))
            .or_else(|| Self::match_task_verb(&original, &lower))?;

        Some(
            task.with_priority(infer_priority(text))
                .with_due(infer_due_hint(text)),
        )
    }

    fn match_url(original: &[&str], lower: &[String]) -> Option<CapturedTask> {
        let idx = lower.iter().position(|w| is_url(w))?;
        let url = original[idx].trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ')' | '!' | '?'));

        let rest: Vec<&str> = original
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, w)| *w)
            .collect();
        let content = if rest.is_empty() {
            OPEN_LINK_LABEL.to_string()
        } else {
            rest.join(" ")
        };

        Some(
            CapturedTask::new(content, TaskSource::Pattern)
                .with_action(ActionKind::OpenLink)
                .with_target(url),
        )
    }

    fn match_contact_verb(original: &[&str], lower: &[String]) -> Option<CapturedTask> {
        let (len, kind) = find_prefix(lower, CONTACT_VERBS)?;

        let mut task =
            CapturedTask::new(capitalize_first(&original.join(" ")), TaskSource::Pattern).with_action(kind);
        if let Some(name) = contact_name(&original[len..]) {
            task = task.with_contact(name);
        }
        Some(task)
    }

    fn match_rich_verb(original: &[&str], lower: &[String]) -> Option<CapturedTask> {
        let (len, kind) = find_prefix(lower, RICH_VERBS)?;
        let target = original[len..].join(" ");

        Some(
            CapturedTask::new(capitalize_first(&original.join(" ")), TaskSource::Pattern)
                .with_action(kind)
                .with_target(target),
        )
    }

    fn match_task_verb(original: &[&str], lower: &[String]) -> Option<CapturedTask> {
        TASK_VERBS
            .iter()
            .find(|prefix| starts_with_words(lower, prefix))?;

        Some(CapturedTask::new(
            capitalize_first(&original.join(" ")),
            TaskSource::Pattern,
        ))
    }
}

/// Recognizes `http://`, `https://` and `www.` links
pub fn is_url(word: &str) -> bool {
    let word = word.to_ascii_lowercase();
    (word.starts_with("http://") || word.starts_with("https://") || word.starts_with("www."))
        && word.len() > 8
}

/// First table entry whose words prefix the input with at least one word left over
fn find_prefix(lower: &[String], table: &[(&[&str], ActionKind)]) -> Option<(usize, ActionKind)> {
    table
        .iter()
        .find(|(prefix, _)| starts_with_words(lower, prefix))
        .map(|(prefix, kind)| (prefix.len(), *kind))
}

fn starts_with_words(lower: &[String], prefix: &[&str]) -> bool {
    lower.len() > prefix.len() && prefix.iter().zip(lower).all(|(p, w)| trim_punctuation(w) == *p)
}

/// Up to three words after the verb, stopping at the first stop word
fn contact_name(words: &[&str]) -> Option<String> {
    let mut name = Vec::new();

    for (i, raw) in words.iter().enumerate() {
        let word = trim_punctuation(raw);
        let lower = word.to_lowercase();

        if i == 0 && CONTACT_LEADING.contains(&lower.as_str()) {
            continue;
        }
        if word.is_empty() || CONTACT_STOP_WORDS.contains(&lower.as_str()) {
            break;
        }
        name.push(word);
        if name.len() == MAX_CONTACT_WORDS {
            break;
        }
        // A trailing comma closes the name ("text Sam, running late")
        if raw.ends_with(',') {
            break;
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DueHint, Priority};

    fn extract(text: &str) -> Option<CapturedTask> {
        PatternExtractor::new().try_extract(text)
    }

    #[test]
    fn test_call_with_due_hint() {
        let task = extract("call mom tomorrow").unwrap();
        assert_eq!(task.content, "Call mom tomorrow");
        assert_eq!(task.action_kind, ActionKind::Call);
        assert_eq!(task.contact_name.as_deref(), Some("mom"));
        assert_eq!(task.due_hint, DueHint::Tomorrow);
        assert_eq!(task.source, TaskSource::Pattern);
        assert!(task.action_target.is_none());
    }

    #[test]
    fn test_contact_name_keeps_case_and_skips_possessive() {
        let task = extract("text my Aunt Sarah about dinner").unwrap();
        assert_eq!(task.action_kind, ActionKind::Text);
        assert_eq!(task.contact_name.as_deref(), Some("Aunt Sarah"));
    }

    #[test]
    fn test_contact_name_capped_at_three_words() {
        let task = extract("email Mary Anne Smith Jones re invoice").unwrap();
        assert_eq!(task.contact_name.as_deref(), Some("Mary Anne Smith"));
    }

    #[test]
    fn test_contact_verb_without_name() {
        let task = extract("call tomorrow morning").unwrap();
        assert_eq!(task.action_kind, ActionKind::Call);
        assert!(task.contact_name.is_none());
    }

    #[test]
    fn test_url_detection() {
        let task = extract("https://example.com/recipe check this out").unwrap();
        assert_eq!(task.action_kind, ActionKind::OpenLink);
        assert_eq!(task.action_target.as_deref(), Some("https://example.com/recipe"));
        assert_eq!(task.content, "check this out");
    }

    #[test]
    fn test_url_variants() {
        let task = extract("www.example.com/a later").unwrap();
        assert_eq!(task.content, "later");

        let task = extract("read https://Example.com/Path").unwrap();
        assert_eq!(task.action_target.as_deref(), Some("https://Example.com/Path"));
        assert_eq!(task.content, "read");
    }

    #[test]
    fn test_rich_verbs() {
        let task = extract("navigate to Central Park").unwrap();
        assert_eq!(task.action_kind, ActionKind::Navigate);
        assert_eq!(task.action_target.as_deref(), Some("Central Park"));

        let task = extract("search for cheap flights to Lisbon").unwrap();
        assert_eq!(task.action_kind, ActionKind::Search);
        assert_eq!(task.action_target.as_deref(), Some("cheap flights to Lisbon"));

        let task = extract("schedule dentist appointment next week").unwrap();
        assert_eq!(task.action_kind, ActionKind::Calendar);
        assert_eq!(task.due_hint, DueHint::NextWeek);
    }

    #[test]
    fn test_generic_task_verbs() {
        let task = extract("buy milk").unwrap();
        assert_eq!(task.content, "Buy milk");
        assert_eq!(task.action_kind, ActionKind::None);
        assert_eq!(task.priority, Priority::Medium);

        let task = extract("remind me to pay rent asap").unwrap();
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_word_bounds() {
        assert!(extract("call").is_none());
        assert!(extract("buy").is_none());
        let long = "buy milk and eggs and bread and butter and jam and tea and coffee";
        assert!(long.split_whitespace().count() > MAX_WORDS);
        assert!(extract(long).is_none());
    }

    #[test]
    fn test_no_match_falls_through() {
        assert!(extract("I'm feeling really overwhelmed today").is_none());
        assert!(extract("the meeting went long").is_none());
        assert!(extract("calling is hard").is_none());
    }
}
