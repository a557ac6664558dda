//! Worker loop and pool.
//!
//! Each worker owns a queue connection and handles one message at a time:
//!
//! ```text
//! pop ─► parse ─┬─► malformed: log, drop
//!               ├─► other command type: log, skip
//!               └─► job: pipeline attempt ─► fail? wait n*unit ─► retry (≤ max)
//! ```
//!
//! Queue errors pause the worker briefly instead of stopping it. Shutdown is
//! observed between messages and during backoff waits, never mid-attempt.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::adapters::JobQueue;
use crate::domain::{Job, JobOutcome, JobReport, MessageError, ParsedMessage};

use super::pipeline::{JobPipeline, RetryPolicy};

/// Knobs shared by every worker in a pool
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Only messages with this `command_type` are processed
    pub command_type: String,

    /// Longest single wait on the queue
    pub pop_timeout: Duration,

    /// Pause after a queue backend error
    pub queue_error_pause: Duration,

    pub retry: RetryPolicy,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            command_type: "youtube_transcript_dl".to_string(),
            pop_timeout: Duration::from_secs(5),
            queue_error_pause: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to a single queue message
#[derive(Debug)]
pub enum MessageOutcome {
    Processed(JobReport),
    Ignored,
    Dropped(MessageError),
}

/// A single sequential consumer of the queue
pub struct Worker<Q: JobQueue> {
    id: usize,
    queue: Q,
    pipeline: Arc<JobPipeline>,
    settings: WorkerSettings,
}

impl<Q: JobQueue> Worker<Q> {
    pub fn new(id: usize, queue: Q, pipeline: Arc<JobPipeline>, settings: WorkerSettings) -> Self {
        Self {
            id,
            queue,
            pipeline,
            settings,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Pop and process messages until `shutdown` is cancelled
    #[instrument(skip_all, fields(worker = self.id))]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Worker started");

        while !shutdown.is_cancelled() {
            debug!("Waiting for new instruction...");
            let message = match self.queue.pop(self.settings.pop_timeout).await {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        error = %e,
                        pause_ms = self.settings.queue_error_pause.as_millis() as u64,
                        "Queue error, pausing worker"
                    );
                    pause(&shutdown, self.settings.queue_error_pause).await;
                    continue;
                }
            };

            self.handle_message(&message, &shutdown).await;
        }

        info!("Worker stopped");
    }

    /// Parse one raw message and process it if it is a job for us
    pub async fn handle_message(&self, raw: &str, shutdown: &CancellationToken) -> MessageOutcome {
        info!(preview = %preview(raw, 100), "Received instruction");

        match Job::parse(raw, &self.settings.command_type) {
            Ok(ParsedMessage::Job(job)) => {
                info!(job_id = %job.job_id, url = %job.url, "Processing instruction");
                MessageOutcome::Processed(self.process_with_retry(&job, shutdown).await)
            }
            Ok(ParsedMessage::Ignored { command_type }) => {
                warn!(?command_type, "Ignoring instruction with unhandled command type");
                MessageOutcome::Ignored
            }
            Err(e) => {
                error!(error = %e, "Dropping invalid instruction");
                MessageOutcome::Dropped(e)
            }
        }
    }

    /// Run the pipeline until it succeeds or the retry policy gives up
    pub async fn process_with_retry(&self, job: &Job, shutdown: &CancellationToken) -> JobReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("job", %run_id, job_id = %job.job_id);
        self.retry_loop(run_id, job, shutdown).instrument(span).await
    }

    async fn retry_loop(&self, run_id: Uuid, job: &Job, shutdown: &CancellationToken) -> JobReport {
        let retry = &self.settings.retry;
        let started_at = Utc::now();
        let mut attempt = 0u32;

        let outcome = loop {
            attempt += 1;

            match self.pipeline.run(job).await {
                Ok(bytes) => {
                    info!(job_id = %job.job_id, url = %job.url, attempt, "Successfully processed instruction");
                    break JobOutcome::Delivered { bytes };
                }
                Err(e) if retry.should_retry(attempt) => {
                    let delay = retry.delay_after(attempt);
                    warn!(
                        job_id = %job.job_id,
                        attempt,
                        max_attempts = retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );

                    if !pause(shutdown, delay).await {
                        warn!(job_id = %job.job_id, "Shutdown requested, abandoning retries");
                        break JobOutcome::Interrupted {
                            error: e.to_string(),
                        };
                    }
                }
                Err(e) => {
                    error!(
                        job_id = %job.job_id,
                        url = %job.url,
                        attempts = attempt,
                        error = %e,
                        "Failed to process instruction after all attempts"
                    );
                    break JobOutcome::Abandoned {
                        error: e.to_string(),
                    };
                }
            }
        };

        JobReport {
            run_id,
            job_id: job.job_id.clone(),
            url: job.url.clone(),
            attempts: attempt,
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Sleep for `duration` unless shutdown fires first; `true` if the full wait elapsed
async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn preview(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

/// Fixed set of workers sharing one queue and pipeline
pub struct WorkerPool<Q: JobQueue> {
    workers: Vec<Worker<Q>>,
}

impl<Q: JobQueue + 'static> WorkerPool<Q> {
    pub fn new(workers: Vec<Worker<Q>>) -> Self {
        Self { workers }
    }

    /// Run every worker concurrently until all have stopped
    pub async fn run(self, shutdown: CancellationToken) {
        info!(workers = self.workers.len(), "Launching workers");

        let handles: Vec<_> = self
            .workers
            .into_iter()
            .map(|worker| {
                let id = worker.id();
                (id, tokio::spawn(worker.run(shutdown.clone())))
            })
            .collect();

        for (id, handle) in handles {
            if let Err(e) = handle.await {
                error!(worker = id, error = %e, "Worker task ended abnormally");
            }
        }

        info!("All workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("short", 100), "short");
    }

    #[tokio::test]
    async fn test_pause_returns_early_on_shutdown() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        assert!(!pause(&shutdown, Duration::from_secs(3600)).await);
    }
}
