//! Transactional scope with an in-progress guard for clone and import work.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::clone::error::CloneError;
use crate::clone::store::{AssociationStore, AssociationTx};
use crate::clone::CloneOperation;
use crate::domain::{Event, JobUser};

/// Runs a unit of association work atomically against one destination event.
///
/// The event's guard flag is taken with a compare-and-set before the
/// transaction opens, so a second clone or import of the same event is
/// rejected instead of racing. The flag is released on every path once
/// taken.
pub struct TransactionProvider<S> {
    store: Arc<S>,
}

impl<S> Clone for TransactionProvider<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AssociationStore> TransactionProvider<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run `work` inside a transaction while holding `event`'s guard.
    ///
    /// Commits when `work` returns `Ok`, rolls back and returns the original
    /// error otherwise. Fails with [`CloneError::AlreadyInProgress`] without
    /// running `work` if the event is already held.
    pub async fn with_transaction<T, F>(
        &self,
        event: &Event,
        user: &JobUser,
        operation: CloneOperation,
        work: F,
    ) -> Result<T, CloneError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T, CloneError>> + Send,
    {
        if !self.store.try_acquire_guard(event.id, operation).await? {
            tracing::warn!(
                event_id = event.id,
                user_id = user.id,
                %operation,
                "Event is already being cloned or imported"
            );
            return Err(CloneError::AlreadyInProgress {
                event_id: event.id,
                operation,
            });
        }

        tracing::info!(event_id = event.id, user_id = user.id, %operation, "Guard acquired");

        let result = self.run_atomically(work).await;

        if let Err(e) = self.store.release_guard(event.id, operation).await {
            // The stale-guard sweep at worker startup clears it later.
            tracing::error!(
                event_id = event.id,
                %operation,
                error = %e,
                "Failed to release guard"
            );
        }

        match &result {
            Ok(_) => tracing::info!(event_id = event.id, %operation, "Transaction committed"),
            Err(e) => tracing::warn!(
                event_id = event.id,
                %operation,
                error = %e,
                "Transaction rolled back"
            ),
        }

        result
    }

    async fn run_atomically<T, F>(&self, work: F) -> Result<T, CloneError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T, CloneError>> + Send,
    {
        let mut tx = self.store.begin().await?;

        match work(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
