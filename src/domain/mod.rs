//! Domain types for the capture pipeline.
//!
//! This module contains the core data structures:
//! - Task: Captured task candidates and their enums
//! - Chat: Role-tagged messages and bounded history
//! - Session: Observable session phase and snapshot
//! - Events: Capture log entries

pub mod chat;
pub mod events;
pub mod session;
pub mod task;

// Re-export commonly used types
pub use chat::{ChatHistory, ChatMessage, ChatRole};
pub use events::{CaptureEvent, CaptureEventType};
pub use session::{CommitReport, Phase, SessionSnapshot};
pub use task::{ActionKind, CapturedTask, DueHint, Priority, TaskSource};
