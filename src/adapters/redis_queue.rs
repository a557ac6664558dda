//! Redis list used as the job queue.
//!
//! Producers `RPUSH` JSON instructions onto a list; each worker owns its own
//! connection and takes messages with `BLPOP`. The pop wait is bounded so a
//! worker can notice shutdown between messages. The connection manager
//! reconnects on its own after the backend drops the connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use super::{JobQueue, QueueError};

/// One worker's connection to the instruction list
pub struct RedisQueue {
    connection: ConnectionManager,
    queue_name: String,
}

impl RedisQueue {
    /// Connect to `redis_url` and pop from `queue_name`
    pub async fn connect(redis_url: &str, queue_name: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        let queue_name = queue_name.into();

        info!(queue = %queue_name, "Connected to Redis");
        Ok(Self {
            connection,
            queue_name,
        })
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn pop(&mut self, wait: Duration) -> Result<Option<String>, QueueError> {
        // BLPOP treats 0 as "block forever"
        let wait_secs = wait.as_secs_f64().max(0.01);

        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&self.queue_name)
            .arg(wait_secs)
            .query_async(&mut self.connection)
            .await?;

        Ok(reply.map(|(_, message)| message))
    }
}
