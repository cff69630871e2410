//! Persistence seams for the clone subsystem.
//!
//! [`EventCatalog`] covers the non-transactional event reads and writes the
//! queue service and transaction provider need. [`AssociationStore`] adds
//! transactions; all join-table mutation goes through an [`AssociationTx`].

use async_trait::async_trait;

use crate::association::AssociationKind;
use crate::clone::error::CloneError;
use crate::clone::CloneOperation;
use crate::domain::{AssociationLink, Event, NewAssociationLink, NewEvent};
use crate::types::DbId;

/// Event lookups, creation and the in-progress guard.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Find an event by id.
    async fn find_event(&self, id: DbId) -> Result<Option<Event>, CloneError>;

    /// Names of the company's events that contain `base_name` anywhere.
    ///
    /// Clone markers may precede the base name, so a prefix match is not
    /// enough.
    async fn list_event_names(
        &self,
        company_id: DbId,
        base_name: &str,
    ) -> Result<Vec<String>, CloneError>;

    /// Insert a new event with both guard flags cleared.
    async fn create_event(&self, input: &NewEvent) -> Result<Event, CloneError>;

    /// Delete an event together with its join rows and tasks.
    ///
    /// Used to undo [`create_event`](Self::create_event) when the clone job
    /// for the new event could not be queued.
    async fn remove_event(&self, id: DbId) -> Result<(), CloneError>;

    /// Atomically set the guard flag for `operation`.
    ///
    /// Succeeds only if neither flag is currently set on the event. Returns
    /// `false` when another clone or import holds the event.
    async fn try_acquire_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<bool, CloneError>;

    /// Clear the guard flag for `operation`.
    async fn release_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<(), CloneError>;

    /// Clear both flags on every event not listed in `held_event_ids`.
    ///
    /// Run at worker startup to recover guards left behind by a crash.
    async fn release_stale_guards(&self, held_event_ids: &[DbId]) -> Result<u64, CloneError>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<(), CloneError>;
}

/// A catalog that can also open transactions over the join tables.
#[async_trait]
pub trait AssociationStore: EventCatalog {
    type Tx: AssociationTx;

    /// Open a new transaction.
    async fn begin(&self) -> Result<Self::Tx, CloneError>;
}

/// Join-table operations scoped to one open transaction.
///
/// Nothing written through a transaction is visible to other readers until
/// [`commit`](AssociationTx::commit); [`rollback`](AssociationTx::rollback)
/// discards it.
#[async_trait]
pub trait AssociationTx: Send {
    /// All join rows of `kind` for the event, ordered by id.
    async fn list_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<AssociationLink>, CloneError>;

    /// Insert one join row. Fails if the `(event_id, target_id)` pair exists.
    async fn insert_link(
        &mut self,
        kind: AssociationKind,
        link: &NewAssociationLink,
    ) -> Result<AssociationLink, CloneError>;

    /// Delete every join row of `kind` for the event, returning the removed
    /// target ids.
    async fn delete_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<DbId>, CloneError>;

    /// Null the `kind` reference on the event's tasks that point at any of
    /// `target_ids`. Returns the number of tasks changed.
    async fn detach_tasks(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
        target_ids: &[DbId],
    ) -> Result<u64, CloneError>;

    async fn commit(self) -> Result<(), CloneError>;

    async fn rollback(self) -> Result<(), CloneError>;
}
