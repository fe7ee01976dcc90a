//! Chat transcript kept while a session is in the chatting phase.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Role name as used by chat-completion APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Bounded chat history. Once `window` messages are held, pushing a new one
/// drops the oldest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    messages: VecDeque<ChatMessage>,
    window: usize,
}

impl ChatHistory {
    /// Create an empty history holding at most `window` messages
    pub fn new(window: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(window),
            window: window.max(1),
        }
    }

    /// Append a message, trimming the oldest beyond the window
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.window {
            self.messages.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in chronological order
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    /// The most recent `n` messages, oldest first
    pub fn tail(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }
}
