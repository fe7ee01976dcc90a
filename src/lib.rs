//! nudge - Capture loose thoughts as reviewable tasks
//!
//! Takes a spoken or typed utterance and turns it into zero or more task
//! candidates the user can review, edit and save, or routes it to a short
//! supportive conversation when nothing actionable was said.
//!
//! # Architecture
//!
//! Extraction is tiered, cheapest first:
//! - Pattern tier: instant verb-prefix matching, no network
//! - Provider tiers: remote model, then local model, behind timeouts,
//!   a single retry and a circuit breaker
//! - Keyword tier: deterministic fallback that always yields a task
//!
//! Candidates pass through contact resolution and a duplicate scan against
//! open tasks before the user sees them.
//!
//! # Modules
//!
//! - `adapters`: Model providers, contact directory, task store
//! - `core`: Capture session actor, resilient AI client, capture log
//! - `domain`: Data structures (CapturedTask, ChatHistory, SessionSnapshot)
//! - `extract`: Pure extraction helpers (pattern, classifier, duplicates)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Capture a thought
//! nudge capture call mom tomorrow
//!
//! # Interactive capture
//! nudge repl
//!
//! # See how an utterance would be routed
//! nudge classify "how do I stop procrastinating?"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod extract;

// Re-export main types at crate root for convenience
pub use core::{CaptureSession, ResilientAiClient, SessionError, SessionHandle, TranscriptUpdate};
pub use domain::{ActionKind, CapturedTask, DueHint, Phase, Priority, SessionSnapshot, TaskSource};
pub use extract::{ConversationClassifier, DuplicateDetector, PatternExtractor};
