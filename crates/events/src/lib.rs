//! Realtime notification plumbing for the clone service.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Implements the core `Notifier` seam.
//! - [`ChannelEvent`]: the envelope published on the bus.
//! - [`PusherRelay`]: background subscriber that forwards every event to
//!   an external realtime endpoint, at most once.

pub mod bus;
pub mod relay;

pub use bus::{ChannelEvent, EventBus};
pub use relay::{PusherRelay, RelayError};
