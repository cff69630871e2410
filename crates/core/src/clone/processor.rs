//! Executes one dequeued clone or import job.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::association::AssociationKind;
use crate::channels;
use crate::clone::error::CloneError;
use crate::clone::handler::{
    associate_event, disassociate_event, AssociationOutcome, DisassociationOutcome,
};
use crate::clone::store::AssociationStore;
use crate::clone::transaction::TransactionProvider;
use crate::clone::CloneOperation;
use crate::domain::Event;
use crate::jobs::{CloneJobKind, CloneJobPayload, ImportMode};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A realtime message announcing that an event's associations changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelNotification {
    pub channel: &'static str,
    /// Event name within the channel.
    pub event: &'static str,
    pub event_id: DbId,
    pub event_name: String,
    pub company_id: DbId,
    pub target_ids: Vec<DbId>,
    pub timestamp: Timestamp,
}

/// Sink for post-commit notifications.
///
/// Implementations must not block; delivery is best effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: ChannelNotification);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: ChannelNotification) {}
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Summary of a processed job, stored as the job result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneReport {
    pub operation: CloneOperation,
    pub source_event_id: DbId,
    pub destination_event_id: DbId,
    pub association: AssociationOutcome,
    /// Present only for imports that replaced existing associations.
    pub disassociation: Option<DisassociationOutcome>,
}

impl CloneReport {
    fn notifications(&self, destination: &Event) -> Vec<ChannelNotification> {
        let timestamp = Utc::now();
        let mut out = Vec::new();

        let notification = |channel, event, target_ids: Vec<DbId>| ChannelNotification {
            channel,
            event,
            event_id: destination.id,
            event_name: destination.name.clone(),
            company_id: destination.company_id,
            target_ids,
            timestamp,
        };

        if let Some(removal) = &self.disassociation {
            for category in &removal.categories {
                if !category.removed_target_ids.is_empty() {
                    out.push(notification(
                        category.kind.disassociate_channel(),
                        channels::EVENT_DISASSOCIATED,
                        category.removed_target_ids.clone(),
                    ));
                }
            }
        }

        for category in &self.association.categories {
            if !category.created_target_ids.is_empty() {
                out.push(notification(
                    category.kind.associate_channel(),
                    channels::EVENT_ASSOCIATED,
                    category.created_target_ids.clone(),
                ));
            }
        }

        out
    }

    /// Number of rows created for `kind`.
    pub fn created(&self, kind: AssociationKind) -> usize {
        self.association
            .category(kind)
            .map_or(0, |c| c.created_target_ids.len())
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Runs association jobs against a store under the transaction provider.
pub struct CloneProcessor<S> {
    store: Arc<S>,
    transactions: TransactionProvider<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: AssociationStore> CloneProcessor<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        let transactions = TransactionProvider::new(Arc::clone(&store));
        Self {
            store,
            transactions,
            notifier,
        }
    }

    /// Process a single job payload.
    ///
    /// The source and destination are re-read so a job that outlived either
    /// event fails with [`CloneError::NotFound`]. All writes happen in one
    /// transaction; notifications go out only after it commits.
    pub async fn process(
        &self,
        kind: CloneJobKind,
        payload: &CloneJobPayload,
    ) -> Result<CloneReport, CloneError> {
        let operation = kind.operation();
        let destination = self.require_event(payload.new_event.id).await?;
        let source = self.require_event(payload.id).await?;

        let replace = kind == CloneJobKind::ImportAssociation
            && payload.import_mode == ImportMode::Replace;
        let source_id = source.id;
        let dest = destination.clone();

        let report = self
            .transactions
            .with_transaction(&destination, &payload.user, operation, move |tx| {
                Box::pin(async move {
                    let disassociation = if replace {
                        Some(disassociate_event(tx, dest.id).await?)
                    } else {
                        None
                    };
                    let association = associate_event(tx, source_id, &dest, operation).await?;
                    Ok(CloneReport {
                        operation,
                        source_event_id: source_id,
                        destination_event_id: dest.id,
                        association,
                        disassociation,
                    })
                })
            })
            .await?;

        let notifications = report.notifications(&destination);
        tracing::info!(
            %operation,
            source_event_id = source.id,
            destination_event_id = destination.id,
            created = report.association.total_created(),
            removed = report
                .disassociation
                .as_ref()
                .map_or(0, DisassociationOutcome::total_removed),
            notifications = notifications.len(),
            "Association job processed"
        );
        for notification in notifications {
            self.notifier.notify(notification);
        }

        Ok(report)
    }

    async fn require_event(&self, id: DbId) -> Result<Event, CloneError> {
        self.store
            .find_event(id)
            .await?
            .ok_or(CloneError::NotFound { entity: "Event", id })
    }
}
