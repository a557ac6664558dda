//! Adapter interfaces for external systems.
//!
//! The pipeline only talks to the outside world through these traits:
//! - `Downloader`: fetches a caption file for a source URL
//! - `Delivery`: posts normalized text to the job's endpoint
//! - `JobQueue`: blocking pop of raw job messages

pub mod http;
pub mod redis_queue;
pub mod ytdlp;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::http::HttpDelivery;
pub use self::redis_queue::RedisQueue;
pub use self::ytdlp::YtDlpDownloader;

/// Failures of the download capability
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to spawn downloader: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Downloader timed out after {0:?}")]
    Timeout(Duration),

    #[error("Downloader exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },
}

/// Failures of the delivery capability
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failures talking to the queue backend; the worker pauses and resumes
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(#[from] redis::RedisError),
}

/// Metadata sent alongside the normalized text
#[derive(Debug, Clone, Copy)]
pub struct DeliveryMeta<'a> {
    pub user_id: &'a str,
    pub delivery_target: &'a str,
    pub endpoint: &'a str,
}

/// Writes `transcript_<job_id>.<lang>.<ext>` into scratch storage
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable downloader name
    fn name(&self) -> &str;

    /// Fetch captions for `url`; success does not guarantee a file exists
    async fn download(&self, url: &str, job_id: &str) -> Result<(), DownloadError>;
}

/// Sends normalized text downstream
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver `content`; any non-success response is an error
    async fn deliver(&self, content: &str, meta: DeliveryMeta<'_>) -> Result<(), DeliveryError>;
}

/// Source of raw job messages, owned by a single worker
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Pop the next message, waiting at most `wait`; `None` when nothing arrived
    async fn pop(&mut self, wait: Duration) -> Result<Option<String>, QueueError>;
}
