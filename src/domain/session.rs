//! Observable capture session state.
//!
//! The session actor publishes a `SessionSnapshot` after every transition;
//! the presentation layer renders from it and never mutates it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::ChatMessage;
use super::task::CapturedTask;

/// Phase of the capture surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing happening
    Idle,

    /// Voice input in progress, partial transcripts arriving
    Listening,

    /// Input finalized, about to be processed
    Transcribing,

    /// Extraction or chat call in flight
    Thinking,

    /// Candidates waiting for the user
    Reviewing,

    /// Conversational exchange in progress
    Chatting,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

/// Outcome of the most recent commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Tasks the store accepted
    pub saved: Vec<Uuid>,

    /// Tasks the store rejected, with the store's message
    pub failed: Vec<(Uuid, String)>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current phase
    pub phase: Phase,

    /// Candidates awaiting review, in utterance order
    pub pending_candidates: Vec<CapturedTask>,

    /// Chat transcript (only meaningful while chatting)
    pub chat_history: Vec<ChatMessage>,

    /// Latest partial transcript while listening
    pub interim_transcript: Option<String>,

    /// Result of the last commit, if any
    pub last_commit: Option<CommitReport>,
}

impl SessionSnapshot {
    /// The last assistant reply in the chat history
    pub fn last_reply(&self) -> Option<&str> {
        self.chat_history
            .iter()
            .rev()
            .find(|m| m.role == super::chat::ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }
}
