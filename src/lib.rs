//! caption-relay - Subtitle download and normalization worker
//!
//! Consumes caption download jobs from a Redis list, turns the downloaded
//! WebVTT/SRT track into clean paragraphs and posts the text to the job's
//! HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! Redis ─► Worker (×N) ─► JobPipeline ─► Normalizer ─► HTTP endpoint
//!                              │
//!                              └─ ArtifactManager (locate / cleanup)
//! ```
//!
//! # Modules
//!
//! - `adapters`: External capabilities (yt-dlp, HTTP delivery, Redis queue)
//! - `core`: Normalizer, artifact handling, pipeline, worker loop
//! - `domain`: Data structures (Job, CaptionTrack, NormalizedText)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start two workers against a local Redis
//! caption-relay run redis://127.0.0.1:6379
//!
//! # Normalize a caption file by hand
//! caption-relay normalize --input transcript.en.vtt
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{normalize, JobError, JobPipeline, RetryPolicy, Worker, WorkerPool};
pub use domain::{CaptionFormat, Job, JobOutcome, JobReport, NormalizedText};
