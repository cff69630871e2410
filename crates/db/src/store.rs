//! PostgreSQL implementation of the clone store seams.

use async_trait::async_trait;
use muster_core::association::AssociationKind;
use muster_core::clone::{AssociationStore, AssociationTx, CloneError, CloneOperation, EventCatalog};
use muster_core::domain::{AssociationLink, Event, NewAssociationLink, NewEvent};
use muster_core::types::DbId;
use sqlx::{Postgres, Transaction};

use crate::error::store_error;
use crate::repositories::{AssociationRepo, EventRepo, TaskRepo};
use crate::DbPool;

/// Event catalog and transactional association store over a pool.
#[derive(Debug, Clone)]
pub struct PgCloneStore {
    pool: DbPool,
}

impl PgCloneStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EventCatalog for PgCloneStore {
    async fn find_event(&self, id: DbId) -> Result<Option<Event>, CloneError> {
        let row = EventRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(row.map(Event::from))
    }

    async fn list_event_names(
        &self,
        company_id: DbId,
        base_name: &str,
    ) -> Result<Vec<String>, CloneError> {
        EventRepo::list_names_containing(&self.pool, company_id, base_name)
            .await
            .map_err(store_error)
    }

    async fn create_event(&self, input: &NewEvent) -> Result<Event, CloneError> {
        let row = EventRepo::create(&self.pool, input.company_id, &input.name)
            .await
            .map_err(store_error)?;
        Ok(row.into())
    }

    async fn remove_event(&self, id: DbId) -> Result<(), CloneError> {
        EventRepo::delete(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn try_acquire_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<bool, CloneError> {
        EventRepo::try_acquire_guard(&self.pool, event_id, operation)
            .await
            .map_err(store_error)?
            .ok_or(CloneError::NotFound {
                entity: "Event",
                id: event_id,
            })
    }

    async fn release_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<(), CloneError> {
        EventRepo::release_guard(&self.pool, event_id, operation)
            .await
            .map_err(store_error)
    }

    async fn release_stale_guards(&self, held_event_ids: &[DbId]) -> Result<u64, CloneError> {
        EventRepo::release_stale_guards(&self.pool, held_event_ids)
            .await
            .map_err(store_error)
    }

    async fn health_check(&self) -> Result<(), CloneError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}

#[async_trait]
impl AssociationStore for PgCloneStore {
    type Tx = PgCloneTx;

    async fn begin(&self) -> Result<PgCloneTx, CloneError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(PgCloneTx { tx })
    }
}

/// An open database transaction.
///
/// Dropping it without [`commit`](AssociationTx::commit) rolls back.
pub struct PgCloneTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AssociationTx for PgCloneTx {
    async fn list_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<AssociationLink>, CloneError> {
        let rows = AssociationRepo::list_for_event(&mut *self.tx, kind, event_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(AssociationLink::from).collect())
    }

    async fn insert_link(
        &mut self,
        kind: AssociationKind,
        link: &NewAssociationLink,
    ) -> Result<AssociationLink, CloneError> {
        let row = AssociationRepo::insert(
            &mut *self.tx,
            kind,
            link.event_id,
            link.target_id,
            link.created_by,
        )
        .await
        .map_err(store_error)?;
        Ok(row.into())
    }

    async fn delete_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<DbId>, CloneError> {
        AssociationRepo::delete_for_event(&mut *self.tx, kind, event_id)
            .await
            .map_err(store_error)
    }

    async fn detach_tasks(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
        target_ids: &[DbId],
    ) -> Result<u64, CloneError> {
        TaskRepo::detach(&mut *self.tx, kind, event_id, target_ids)
            .await
            .map_err(store_error)
    }

    async fn commit(self) -> Result<(), CloneError> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), CloneError> {
        self.tx.rollback().await.map_err(store_error)
    }
}
