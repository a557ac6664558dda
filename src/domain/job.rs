//! Jobs parsed from queue messages and their processing state.
//!
//! A Job is immutable once parsed. Its id namespaces every temporary file the
//! pipeline writes, so ids that could escape the scratch directory are rejected.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while turning a raw queue message into a [`Job`]
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Malformed job message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Malformed job message: missing field '{0}'")]
    MissingField(&'static str),

    #[error("Malformed job message: unsafe job id '{0}'")]
    UnsafeJobId(String),
}

/// Raw queue payload as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(default)]
    pub command_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Option<MessageId>,
    #[serde(default)]
    pub lead_magnet_id: Option<MessageId>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Identifier producers send either as a JSON string or a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Text(String),
    Number(serde_json::Number),
}

impl MessageId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Result of parsing a queue message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    /// A job this worker handles
    Job(Job),

    /// Well-formed message carrying another command type
    Ignored { command_type: Option<String> },
}

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Source identifier handed to the downloader
    pub url: String,

    /// Unique id used to namespace temporary files (the `lead_magnet_id`)
    pub job_id: String,

    pub user_id: String,

    /// Opaque identifier sent back to the delivery endpoint
    pub delivery_target: String,

    /// Destination address for the normalized text
    pub endpoint: String,
}

impl Job {
    /// Parse a raw queue message.
    ///
    /// Messages whose `command_type` differs from `command_type` are returned as
    /// [`ParsedMessage::Ignored`] without validating the remaining fields.
    pub fn parse(raw: &str, command_type: &str) -> Result<ParsedMessage, MessageError> {
        let message: QueueMessage = serde_json::from_str(raw)?;

        if message.command_type.as_deref() != Some(command_type) {
            return Ok(ParsedMessage::Ignored {
                command_type: message.command_type,
            });
        }

        let job_id = required(
            message.lead_magnet_id.map(MessageId::into_string),
            "lead_magnet_id",
        )?;
        if !is_safe_job_id(&job_id) {
            return Err(MessageError::UnsafeJobId(job_id));
        }

        Ok(ParsedMessage::Job(Job {
            url: required(message.url, "url")?,
            user_id: required(message.user_id.map(MessageId::into_string), "user_id")?,
            delivery_target: job_id.clone(),
            job_id,
            endpoint: required(message.endpoint, "endpoint")?,
        }))
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MessageError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(MessageError::MissingField(field))
}

/// Job ids become part of file names and glob patterns.
///
/// A dot would let `transcript_<id>.*` match another job's files
/// (`job` vs `job.1`), so ids carry no dots at all.
fn is_safe_job_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['.', '/', '\\', '\0'])
}

/// Stages a job moves through within one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Downloading,
    Normalizing,
    Delivering,
    Delivered,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Normalizing => "normalizing",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final outcome of a job after the retry loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobOutcome {
    /// Normalized text was accepted by the endpoint
    Delivered { bytes: usize },

    /// Every attempt failed; the job is not re-enqueued
    Abandoned { error: String },

    /// Shutdown was requested before the retries ran out
    Interrupted { error: String },
}

/// Summary of one processed job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Correlates the log lines of one processing run; redeliveries of the
    /// same message get a fresh id
    pub run_id: Uuid,

    pub job_id: String,
    pub url: String,

    /// Pipeline runs performed (1-indexed)
    pub attempts: u32,

    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    /// Check if the job ended with a successful delivery
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, JobOutcome::Delivered { .. })
    }
}
