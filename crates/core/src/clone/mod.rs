//! Event clone / import subsystem.
//!
//! - [`handler`] copies and removes association rows inside a transaction.
//! - [`transaction`] wraps a unit of work with the in-progress guard.
//! - [`service`] creates destination events and enqueues jobs.
//! - [`processor`] runs a dequeued job end to end.
//! - [`naming`] derives `[Clone N]` display names.
//! - [`store`] defines the persistence seams the above run against.

pub mod error;
pub mod handler;
pub mod naming;
pub mod processor;
pub mod service;
pub mod store;
pub mod transaction;

use serde::{Deserialize, Serialize};

pub use error::CloneError;
pub use handler::{associate_event, disassociate_event, AssociationOutcome, DisassociationOutcome};
pub use processor::{CloneProcessor, CloneReport, Notifier};
pub use service::QueueService;
pub use store::{AssociationStore, AssociationTx, EventCatalog};
pub use transaction::TransactionProvider;

/// The two guarded operations that can run against a destination event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneOperation {
    /// Duplicate into a brand-new event.
    Clone,
    /// Copy additional associations into an existing event.
    Import,
}

impl CloneOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Import => "import",
        }
    }
}

impl std::fmt::Display for CloneOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
