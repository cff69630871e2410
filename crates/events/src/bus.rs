//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the worker's clone
//! processor, which publishes, and any subscribers such as the relay.

use chrono::{DateTime, Utc};
use muster_core::clone::processor::{ChannelNotification, Notifier};
use muster_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChannelEvent
// ---------------------------------------------------------------------------

/// A message addressed to one realtime channel.
///
/// Constructed via [`ChannelEvent::new`] and enriched with
/// [`for_event`](ChannelEvent::for_event) and
/// [`with_payload`](ChannelEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Channel name, e.g. `"associate-departments-channel"`.
    pub channel: String,

    /// Event name within the channel, e.g. `"associations.created"`.
    pub event: String,

    /// Event whose associations changed.
    pub event_id: Option<DbId>,

    /// Owning company, used by subscribers to scope delivery.
    pub company_id: Option<DbId>,

    /// Channel-specific JSON body.
    pub payload: serde_json::Value,

    /// When the message was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ChannelEvent {
    /// Create a message for `channel` with an empty object payload.
    pub fn new(channel: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            event_id: None,
            company_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the event and company the message concerns.
    pub fn for_event(mut self, event_id: DbId, company_id: DbId) -> Self {
        self.event_id = Some(event_id);
        self.company_id = Some(company_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl From<ChannelNotification> for ChannelEvent {
    fn from(n: ChannelNotification) -> Self {
        let payload = serde_json::json!({
            "event_id": n.event_id,
            "event_name": n.event_name,
            "ids": n.target_ids,
        });
        Self {
            timestamp: n.timestamp,
            ..ChannelEvent::new(n.channel, n.event)
                .for_event(n.event_id, n.company_id)
                .with_payload(payload)
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use muster_events::bus::{ChannelEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChannelEvent::new("associate-departments-channel", "associations.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ChannelEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: ChannelEvent) {
        // A send error only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier for EventBus {
    fn notify(&self, notification: ChannelNotification) {
        tracing::debug!(
            channel = notification.channel,
            event_id = notification.event_id,
            targets = notification.target_ids.len(),
            "Publishing association change"
        );
        self.publish(notification.into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
