//! # Waku REST Transport
//!
//! Talks to a Waku node's REST API (auto-sharding relay endpoints):
//!
//! | Operation | Request |
//! |-----------|---------|
//! | publish | `POST /relay/v1/auto/messages` |
//! | subscribe | `POST /relay/v1/auto/subscriptions` |
//! | poll | `GET /relay/v1/auto/messages/{contentTopic}` |
//!
//! Payloads travel base64-encoded.

use crate::subscriber::Subscription;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayMessageOut<'a> {
    payload: String,
    content_topic: &'a str,
    /// Nanoseconds since the Unix epoch.
    timestamp: u64,
    ephemeral: bool,
}

#[derive(Debug, Deserialize)]
struct RelayMessageIn {
    payload: String,
}

/// [`Transport`] backed by a Waku node's REST API.
pub struct WakuRestTransport {
    http_client: reqwest::Client,
    base_url: reqwest::Url,
    poll_interval: Duration,
}

impl WakuRestTransport {
    /// Default interval between message polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| TransportError::Unavailable(format!("invalid Waku URL: {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self {
            http_client,
            base_url,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        })
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
        endpoint(&self.base_url, segments)
    }
}

/// Append `segments` to `base`, percent-encoding each one (so a content
/// topic's slashes stay inside a single segment).
fn endpoint(base: &reqwest::Url, segments: &[&str]) -> Result<reqwest::Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::Unavailable(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn unavailable(e: reqwest::Error) -> TransportError {
    TransportError::Unavailable(e.to_string())
}

async fn poll_once(
    client: &reqwest::Client,
    url: &reqwest::Url,
) -> Result<Vec<Vec<u8>>, TransportError> {
    let response = client.get(url.clone()).send().await.map_err(unavailable)?;
    if !response.status().is_success() {
        return Err(TransportError::Rejected(format!(
            "poll returned {}",
            response.status()
        )));
    }
    let messages: Vec<RelayMessageIn> = response.json().await.map_err(unavailable)?;
    Ok(messages
        .into_iter()
        .filter_map(|m| match BASE64.decode(m.payload.as_bytes()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Skipping message with invalid base64 payload");
                None
            }
        })
        .collect())
}

#[async_trait]
impl Transport for WakuRestTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        ephemeral: bool,
    ) -> Result<(), TransportError> {
        let message = RelayMessageOut {
            payload: BASE64.encode(payload),
            content_topic: topic,
            timestamp: shared_types::current_timestamp_ms().saturating_mul(1_000_000),
            ephemeral,
        };
        let response = self
            .http_client
            .post(self.endpoint(&["relay", "v1", "auto", "messages"])?)
            .json(&message)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{status}: {body}")));
        }
        debug!(topic, ephemeral, "Message published to Waku");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        let response = self
            .http_client
            .post(self.endpoint(&["relay", "v1", "auto", "subscriptions"])?)
            .json(&[topic])
            .send()
            .await
            .map_err(unavailable)?;
        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "subscribe returned {}",
                response.status()
            )));
        }

        let poll_url = self.endpoint(&["relay", "v1", "auto", "messages", topic])?;
        let client = self.http_client.clone();
        let interval = self.poll_interval;
        let (tx, rx) = mpsc::channel(crate::DEFAULT_CHANNEL_CAPACITY);
        let log_topic = topic.to_string();

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match poll_once(&client, &poll_url).await {
                    Ok(messages) => {
                        for bytes in messages {
                            if tx.send(bytes).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!(topic = %log_topic, error = %e, "Waku poll failed"),
                }
            }
        });

        debug!(topic, "Subscribed via Waku REST");
        Ok(Subscription::from_channel(topic, rx).on_drop(move || poller.abort()))
    }

    fn name(&self) -> &'static str {
        "waku-rest"
    }
}
