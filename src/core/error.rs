//! Failure taxonomy for a single pipeline run.

use thiserror::Error;

use crate::adapters::{DeliveryError, DownloadError};
use crate::domain::JobState;

use super::artifacts::ArtifactError;

/// Errors that end one pipeline attempt.
///
/// Every variant is retried by the worker loop; malformed messages and queue
/// failures never reach the pipeline and are handled by the worker itself.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Download failed: {0}")]
    DownloadFailure(#[from] DownloadError),

    #[error("No caption file found for job {0}")]
    NotFound(String),

    #[error("Normalized content is empty")]
    EmptyContent,

    #[error("Delivery failed: {0}")]
    DeliveryFailure(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl JobError {
    /// Stage that was active when the error occurred
    pub fn stage(&self) -> JobState {
        match self {
            Self::DownloadFailure(_) | Self::NotFound(_) => JobState::Downloading,
            Self::EmptyContent | Self::Io(_) | Self::Task(_) => JobState::Normalizing,
            Self::DeliveryFailure(_) => JobState::Delivering,
        }
    }
}

impl From<ArtifactError> for JobError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NotFound(job_id) => Self::NotFound(job_id),
            ArtifactError::Io(e) => Self::Io(e),
        }
    }
}
