//! Capture log events.
//!
//! Every notable step of a capture session (tier decisions, provider
//! fallbacks, commits, cancellations) can be recorded as an immutable event in
//! an append-only log for later inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the capture log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The session this event belongs to
    pub session_id: Uuid,

    /// Type of event
    pub event_type: CaptureEventType,

    /// Human-readable summary (no user text beyond task titles)
    pub summary: String,

    /// Time taken in milliseconds (for extraction/chat turns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message, if something failed along the way
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureEvent {
    /// Create a new event with the current timestamp
    pub fn new(session_id: Uuid, event_type: CaptureEventType, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            event_type,
            summary: summary.into(),
            duration_ms: None,
            error: None,
        }
    }

    /// Attach a duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach an error message
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Kinds of capture events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEventType {
    /// Input was finalized and processing started
    InputSubmitted,

    /// The pattern tier produced a candidate without any AI call
    FastPathMatched,

    /// Input was routed to chat
    RoutedToChat,

    /// An AI tier produced candidates
    Extracted,

    /// Candidates were surfaced for review
    CandidatesSurfaced,

    /// A candidate was persisted
    Committed,

    /// The task store rejected a candidate
    CommitFailed,

    /// The user discarded candidates
    Discarded,

    /// In-flight work was cancelled
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CaptureEvent::new(
            Uuid::new_v4(),
            CaptureEventType::FastPathMatched,
            "pattern tier matched",
        )
        .with_duration(2);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("fast_path_matched"));
        assert!(!json.contains("\"error\""));

        let parsed: CaptureEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type, CaptureEventType::FastPathMatched);
        assert_eq!(parsed.duration_ms, Some(2));
    }

    #[test]
    fn test_event_with_error() {
        let event = CaptureEvent::new(Uuid::new_v4(), CaptureEventType::CommitFailed, "store rejected")
            .with_error("disk full");

        assert_eq!(event.error.as_deref(), Some("disk full"));
    }
}
