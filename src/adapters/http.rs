//! HTTP delivery of normalized text.
//!
//! POSTs the text as `text/plain` to the job's endpoint with `user_id` and
//! `lead_magnet_id` as query parameters. Only `200 OK` counts as delivered.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{error, info};

use super::{Delivery, DeliveryError, DeliveryMeta};

/// Delivery client backed by reqwest
pub struct HttpDelivery {
    client: reqwest::Client,
}

impl HttpDelivery {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn deliver(&self, content: &str, meta: DeliveryMeta<'_>) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(meta.endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .query(&[
                ("user_id", meta.user_id),
                ("lead_magnet_id", meta.delivery_target),
            ])
            .body(content.to_string())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            info!(
                lead_magnet_id = meta.delivery_target,
                bytes = content.len(),
                "Processed subtitles sent successfully"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            lead_magnet_id = meta.delivery_target,
            status = status.as_u16(),
            %body,
            "Failed to send processed subtitles"
        );
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
