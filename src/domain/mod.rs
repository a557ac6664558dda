//! Domain types for the caption relay.
//!
//! This module contains the core data structures:
//! - Job: A parsed queue instruction and its processing state
//! - Caption: Raw caption tracks and normalized text

pub mod caption;
pub mod job;

// Re-export commonly used types
pub use caption::{CaptionFormat, CaptionTrack, NormalizedText, BYTE_ORDER_MARK, WEBVTT_MARKER};
pub use job::{
    Job, JobOutcome, JobReport, JobState, MessageError, MessageId, ParsedMessage, QueueMessage,
};
