//! Core capture logic.
//!
//! This module contains:
//! - Resilience: per-provider retry state and circuit breaking
//! - AiClient: the provider chain with deterministic fallback
//! - Session: the capture state machine actor and its handle
//! - CaptureLog: append-only session event logging

pub mod ai_client;
pub mod capture_log;
pub mod resilience;
pub mod session;

// Re-export commonly used types
pub use ai_client::{ChatReply, Extraction, ResilientAiClient};
pub use capture_log::CaptureLog;
pub use resilience::{Admission, CircuitPolicy, CircuitState, ProviderHealth, RetryState};
pub use session::{CandidateEdit, CaptureSession, SessionError, SessionHandle, TranscriptUpdate};
