//! Extraction tiers and the pure helpers around them.
//!
//! Everything in this module is synchronous and free of I/O:
//! - Pattern: instant verb-prefix matching for short commands
//! - Classifier: conversational vs. ambiguous routing
//! - Duplicate: fuzzy overlap against existing open tasks
//! - Mapping: model output → task candidates
//! - Fallback: deterministic keyword extraction and curated replies

pub mod classifier;
pub mod duplicate;
pub mod fallback;
pub mod mapping;
pub mod pattern;
pub mod text;

// Re-export commonly used types
pub use classifier::{Classification, ConversationClassifier};
pub use duplicate::DuplicateDetector;
pub use fallback::{curated_reply, KeywordExtractor};
pub use mapping::{parse_extraction, to_candidates, RawTask};
pub use pattern::PatternExtractor;
