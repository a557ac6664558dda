//! Core job processing logic.
//!
//! This module contains:
//! - Normalizer: Caption text to clean paragraphs
//! - Artifacts: Locating and cleaning up scratch files
//! - Pipeline: One download → normalize → deliver attempt
//! - Worker: Queue consumption with bounded retries

pub mod artifacts;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod worker;

// Re-export commonly used types
pub use artifacts::{ArtifactError, ArtifactManager, CleanupGuard, CleanupReport};
pub use error::JobError;
pub use normalizer::{normalize, normalize_as, normalize_track};
pub use pipeline::{JobPipeline, RetryPolicy};
pub use worker::{MessageOutcome, Worker, WorkerPool, WorkerSettings};
