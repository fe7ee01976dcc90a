//! Adapter interfaces for external systems.
//!
//! The capture core talks to three kinds of collaborators, each behind a
//! trait so sessions never depend on a concrete backend:
//! - `AiProvider`: a model that can extract tasks or chat
//! - `ContactResolver`: maps an informal name to a phone/email
//! - `TaskStore`: accepts finished tasks and lists open ones

pub mod contacts;
pub mod http;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod task_store;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{ActionKind, CapturedTask, ChatMessage, TaskSource};
use crate::extract::RawTask;

// Re-export the concrete adapters
pub use contacts::DirectoryResolver;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use task_store::JsonlTaskStore;

/// Input handed to a model
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The user's utterance
    pub text: String,

    /// Recent chat turns, oldest first
    pub history: Vec<ChatMessage>,

    /// Date the model should resolve relative dates against
    pub today: NaiveDate,
}

impl ProviderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            history: Vec::new(),
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Time allowed for one attempt against a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    /// Until the response starts arriving (headers)
    pub first_response: Duration,

    /// For the whole attempt, body included
    pub overall: Duration,
}

/// Failures a provider can report. All of them are transient from the
/// caller's point of view: the resilient client retries once and then moves
/// to the next tier.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("timed out waiting for {stage} after {after_ms}ms")]
    Timeout { stage: &'static str, after_ms: u64 },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider not configured: {0}")]
    Unconfigured(String),
}

impl ProviderError {
    pub fn first_response_timeout(budget: CallBudget) -> Self {
        Self::Timeout {
            stage: "first response",
            after_ms: budget.first_response.as_millis() as u64,
        }
    }

    pub fn overall_timeout(budget: CallBudget) -> Self {
        Self::Timeout {
            stage: "complete response",
            after_ms: budget.overall.as_millis() as u64,
        }
    }
}

/// A model backend
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Human-readable provider name (for logs and health reports)
    fn name(&self) -> &str;

    /// Which tier candidates from this provider are attributed to
    fn tier(&self) -> TaskSource;

    /// Whether the provider can be called at all (e.g. has credentials)
    fn is_available(&self) -> bool {
        true
    }

    /// Extract raw tasks from an utterance
    async fn extract(
        &self,
        request: &ProviderRequest,
        budget: CallBudget,
    ) -> Result<Vec<RawTask>, ProviderError>;

    /// Produce a conversational reply
    async fn chat(&self, request: &ProviderRequest, budget: CallBudget) -> Result<String, ProviderError>;
}

/// A contact resolved from a free-text name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContact {
    /// Phone number or email address, depending on the action
    pub target: String,

    /// Display name ("mom" may resolve to "Linda Kamysz")
    pub canonical_name: String,
}

/// Identity lookup for call/text/email tasks
#[async_trait]
pub trait ContactResolver: Send + Sync {
    /// Resolve `name` to an address suitable for `kind`. `Ok(None)` means no
    /// match.
    async fn resolve(&self, name: &str, kind: ActionKind) -> Result<Option<ResolvedContact>>;
}

/// Destination for committed tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Contents of all open tasks, used for the duplicate scan
    async fn open_tasks(&self) -> Result<Vec<String>>;

    /// Persist a finalized task. Failures are reported, never retried here.
    async fn persist(&self, task: &CapturedTask) -> Result<()>;
}
