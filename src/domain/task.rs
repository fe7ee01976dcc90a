//! Captured task candidates.
//!
//! A `CapturedTask` is created by one of the extraction tiers, adjusted by
//! contact resolution and the duplicate scan, and then handed to the task
//! store. It is serialized as camelCase JSON for the store and the
//! presentation layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reviewable task candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedTask {
    /// Unique identifier, assigned at creation
    pub id: Uuid,

    /// Task text shown to the user
    pub content: String,

    /// What tapping the task should do
    pub action_kind: ActionKind,

    /// Person or business the action targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,

    /// Resolved address (phone, email, url, place, query)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_target: Option<String>,

    /// Coarse due date
    #[serde(default)]
    pub due_hint: DueHint,

    /// Urgency
    #[serde(default)]
    pub priority: Priority,

    /// Icon hint suggested by the AI tiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    /// A contact was expected but could not be resolved
    #[serde(default)]
    pub contact_unresolved: bool,

    /// Overlaps an existing open task
    #[serde(default)]
    pub possible_duplicate: bool,

    /// Extraction tier that produced this candidate
    pub source: TaskSource,

    /// When the candidate was created
    pub created_at: DateTime<Utc>,
}

impl CapturedTask {
    /// Create a plain task with default metadata
    pub fn new(content: impl Into<String>, source: TaskSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            action_kind: ActionKind::None,
            contact_name: None,
            action_target: None,
            due_hint: DueHint::None,
            priority: Priority::Medium,
            emoji: None,
            contact_unresolved: false,
            possible_duplicate: false,
            source,
            created_at: Utc::now(),
        }
    }

    /// Set the action kind
    pub fn with_action(mut self, kind: ActionKind) -> Self {
        self.action_kind = kind;
        self
    }

    /// Set the contact name
    pub fn with_contact(mut self, name: impl Into<String>) -> Self {
        self.contact_name = Some(name.into());
        self
    }

    /// Set the action target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.action_target = Some(target.into());
        self
    }

    /// Set the due hint
    pub fn with_due(mut self, due: DueHint) -> Self {
        self.due_hint = due;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Target is present and non-blank
    pub fn has_target(&self) -> bool {
        self.action_target
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    /// Contact name is present and non-blank
    pub fn has_contact(&self) -> bool {
        self.contact_name
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false)
    }
}

/// What a task does when acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Plain reminder
    None,
    Call,
    Text,
    Email,
    OpenLink,
    Navigate,
    Search,
    Calendar,
}

impl ActionKind {
    /// Parse the loosely-typed action strings models emit ("CALL", "Call",
    /// "open_link", "url", ...). Unknown or empty values map to `None`.
    pub fn parse_loose(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "call" | "phone" | "ring" => Self::Call,
            "text" | "sms" | "message" | "imessage" => Self::Text,
            "email" | "mail" => Self::Email,
            "openlink" | "link" | "url" | "open" | "web" => Self::OpenLink,
            "navigate" | "directions" | "maps" | "map" => Self::Navigate,
            "search" | "lookup" | "google" => Self::Search,
            "calendar" | "schedule" | "event" | "meeting" => Self::Calendar,
            _ => Self::None,
        }
    }

    /// Actions that need a person to be resolved before they can run
    pub fn expects_contact(self) -> bool {
        matches!(self, Self::Call | Self::Text | Self::Email)
    }
}

impl Default for ActionKind {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Call => "call",
            Self::Text => "text",
            Self::Email => "email",
            Self::OpenLink => "openLink",
            Self::Navigate => "navigate",
            Self::Search => "search",
            Self::Calendar => "calendar",
        };
        f.write_str(label)
    }
}

/// Coarse due date hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DueHint {
    None,
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
}

impl Default for DueHint {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for DueHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::ThisWeek => "this week",
            Self::NextWeek => "next week",
        };
        f.write_str(label)
    }
}

/// Task urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a model-supplied priority; anything unrecognized is medium
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" | "critical" => Self::High,
            "low" | "someday" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// Which tier produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Instant verb-prefix match
    Pattern,
    /// Remote model
    Remote,
    /// On-device / local model
    Local,
    /// Deterministic keyword fallback
    Keyword,
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pattern => "pattern",
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Keyword => "keyword",
        };
        f.write_str(label)
    }
}
