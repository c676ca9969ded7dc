//! Domain types for the harvest pipeline.
//!
//! This module contains the core data structures:
//! - Items: videos discovered from a playlist
//! - Records: extracted question/answer rows
//! - Report: per-item outcomes of an extraction run
//! - Error: error kinds shared by all stages

pub mod error;
pub mod item;
pub mod record;
pub mod report;

// Re-export commonly used types
pub use error::{require_env, HarvestError};
pub use item::{RawEntry, SourceItem};
pub use record::{Conversation, QaRecord, QaTriple, Speaker, Turn};
pub use report::{ItemOutcome, ItemStatus, RunReport};
