//! In-process implementations of the store and queue traits.
//!
//! Used by unit and integration tests across the workspace.

mod queue;
mod store;

pub use queue::MemoryJobQueue;
pub use store::{MemoryStore, MemoryTx};
