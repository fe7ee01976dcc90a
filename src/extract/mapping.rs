//! Mapping from raw model output to task candidates.
//!
//! Models answer with `{"tasks": [...]}` where every field is a loosely typed
//! string, sometimes wrapped in markdown fences. This is the single place
//! that output is parsed and normalized; everything past it works with
//! `CapturedTask`.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::{ActionKind, CapturedTask, DueHint, Priority, TaskSource};

use super::text::{capitalize_first, contains_phrase, normalized_words, padded};

/// Most candidates accepted from a single extraction
pub const MAX_CANDIDATES: usize = 10;

/// One task as emitted by a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub emoji: Option<String>,

    #[serde(default)]
    pub action_type: Option<String>,

    #[serde(default)]
    pub contact_name: Option<String>,

    #[serde(default)]
    pub action_target: Option<String>,

    #[serde(default = "default_actionable")]
    pub is_actionable: bool,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub due_date_string: Option<String>,
}

fn default_actionable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvelope {
    Wrapped { tasks: Vec<RawTask> },
    Bare(Vec<RawTask>),
}

/// Remove a surrounding ```json ... ``` fence if present
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

/// Parse a model's message content into raw tasks
pub fn parse_extraction(content: &str) -> Result<Vec<RawTask>, serde_json::Error> {
    let body = strip_code_fences(content);
    let envelope: RawEnvelope = serde_json::from_str(body)?;
    Ok(match envelope {
        RawEnvelope::Wrapped { tasks } => tasks,
        RawEnvelope::Bare(tasks) => tasks,
    })
}

/// Map one raw task to a candidate. Non-actionable or empty entries yield
/// `None`.
pub fn to_candidate(raw: &RawTask, source: TaskSource, today: NaiveDate) -> Option<CapturedTask> {
    if !raw.is_actionable {
        return None;
    }
    let content = non_blank(raw.content.as_deref())?;

    let mut task = CapturedTask::new(capitalize_first(content), source)
        .with_action(ActionKind::parse_loose(raw.action_type.as_deref().unwrap_or_default()))
        .with_priority(Priority::parse_loose(raw.priority.as_deref().unwrap_or_default()))
        .with_due(due_hint_from_string(
            raw.due_date_string.as_deref().unwrap_or_default(),
            today,
        ));

    if let Some(name) = non_blank(raw.contact_name.as_deref()) {
        task = task.with_contact(name);
    }
    if let Some(target) = non_blank(raw.action_target.as_deref()) {
        task = task.with_target(target);
    }
    task.emoji = non_blank(raw.emoji.as_deref()).map(str::to_string);

    Some(task)
}

/// Map a full extraction, keeping utterance order and capping the count
pub fn to_candidates(
    raws: &[RawTask],
    source: TaskSource,
    today: NaiveDate,
    max: usize,
) -> Vec<CapturedTask> {
    raws.iter()
        .filter_map(|raw| to_candidate(raw, source, today))
        .take(max)
        .collect()
}

/// Collapse a model's due string ("tomorrow", "2026-02-13", "friday", ...)
/// into a coarse hint relative to `today`.
pub fn due_hint_from_string(raw: &str, today: NaiveDate) -> DueHint {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return DueHint::None;
    }

    let words = padded(&normalized_words(&lower));
    let has = |phrases: &[&str]| phrases.iter().any(|p| contains_phrase(&words, p));

    if has(&["tomorrow"]) {
        return DueHint::Tomorrow;
    }
    if has(&["today", "tonight", "now"]) {
        return DueHint::Today;
    }
    if has(&["next week"]) {
        return DueHint::NextWeek;
    }
    if has(&["this week", "weekend", "this weekend"]) {
        return DueHint::ThisWeek;
    }

    let date = lower
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .or_else(|| next_weekday(&words, today));

    match date {
        Some(date) => hint_for_date(date, today),
        None => DueHint::None,
    }
}

fn hint_for_date(date: NaiveDate, today: NaiveDate) -> DueHint {
    let days = (date - today).num_days();
    let left_this_week = 6 - i64::from(today.weekday().num_days_from_monday());

    if days <= 0 {
        DueHint::Today
    } else if days == 1 {
        DueHint::Tomorrow
    } else if days <= left_this_week {
        DueHint::ThisWeek
    } else if days <= left_this_week + 7 {
        DueHint::NextWeek
    } else {
        DueHint::None
    }
}

/// Next occurrence (after today) of a weekday named in `words` (a
/// `padded` word string)
fn next_weekday(words: &str, today: NaiveDate) -> Option<NaiveDate> {
    const DAYS: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];

    let (_, weekday) = DAYS.iter().find(|(name, _)| contains_phrase(words, name))?;
    let from = i64::from(today.weekday().num_days_from_monday());
    let to = i64::from(weekday.num_days_from_monday());
    let ahead = match (to - from).rem_euclid(7) {
        0 => 7,
        n => n,
    };
    Some(today + chrono::Duration::days(ahead))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
