//! Forwarding of bus events to an external realtime endpoint.
//!
//! [`PusherRelay`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! POSTs each [`ChannelEvent`] as `{ channel, event, data }` JSON. Delivery
//! is at most once: a failed attempt is logged and the event dropped.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::bus::ChannelEvent;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Relay returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// PusherRelay
// ---------------------------------------------------------------------------

/// Delivers channel events to a single relay URL.
pub struct PusherRelay {
    client: reqwest::Client,
    url: String,
}

impl PusherRelay {
    /// Create a relay posting to `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run the relay loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<ChannelEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.deliver(&event).await {
                        tracing::warn!(
                            error = %e,
                            channel = %event.channel,
                            event_id = ?event.event_id,
                            "Relay delivery failed, dropping event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Relay lagged, some events were not forwarded");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, relay shutting down");
                    break;
                }
            }
        }
    }

    /// Send one event. No retry.
    pub async fn deliver(&self, event: &ChannelEvent) -> Result<(), RelayError> {
        let body = serde_json::json!({
            "channel": event.channel,
            "event": event.event,
            "data": event.payload,
            "company_id": event.company_id,
            "timestamp": event.timestamp,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::HttpStatus(response.status().as_u16()));
        }
        tracing::debug!(channel = %event.channel, "Relayed event");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
