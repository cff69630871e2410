//! Association graph copy and removal.
//!
//! [`associate_event`] copies a source event's join rows onto a destination
//! event; [`disassociate_event`] removes every join row of an event and
//! detaches the tasks that referenced the removed targets. Both write only
//! through the caller's transaction and never commit or roll back.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::association::AssociationKind;
use crate::clone::error::CloneError;
use crate::clone::store::AssociationTx;
use crate::clone::CloneOperation;
use crate::domain::{AssociationLink, Event, NewAssociationLink};
use crate::plain_object::create_plain_object;
use crate::types::DbId;

/// Source join-row id to the id of the row created for the destination.
pub type IdMapping = BTreeMap<DbId, DbId>;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What [`associate_event`] did for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCopy {
    pub kind: AssociationKind,
    /// Target ids newly linked to the destination, in source order.
    pub created_target_ids: Vec<DbId>,
    /// Source rows skipped because the destination already had the target.
    pub skipped: usize,
    /// Old-id mapping for the rows created in this category.
    pub id_mapping: IdMapping,
}

/// Result of copying every category from a source to a destination event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationOutcome {
    pub source_event_id: DbId,
    pub destination_event_id: DbId,
    pub operation: CloneOperation,
    pub categories: Vec<CategoryCopy>,
}

impl AssociationOutcome {
    /// Total number of join rows created across all categories.
    pub fn total_created(&self) -> usize {
        self.categories
            .iter()
            .map(|c| c.created_target_ids.len())
            .sum()
    }

    /// The copy result for one category.
    pub fn category(&self, kind: AssociationKind) -> Option<&CategoryCopy> {
        self.categories.iter().find(|c| c.kind == kind)
    }
}

/// What [`disassociate_event`] removed for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRemoval {
    pub kind: AssociationKind,
    pub removed_target_ids: Vec<DbId>,
    /// Tasks whose reference to a removed target was nulled.
    pub detached_tasks: u64,
}

/// Result of removing every association from an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisassociationOutcome {
    pub event_id: DbId,
    pub categories: Vec<CategoryRemoval>,
}

impl DisassociationOutcome {
    pub fn total_removed(&self) -> usize {
        self.categories
            .iter()
            .map(|c| c.removed_target_ids.len())
            .sum()
    }

    pub fn total_detached_tasks(&self) -> u64 {
        self.categories.iter().map(|c| c.detached_tasks).sum()
    }
}

// ---------------------------------------------------------------------------
// Association
// ---------------------------------------------------------------------------

/// Copy every association of `source_event_id` onto `destination`.
///
/// For each category in [`AssociationKind::ALL`] order, a source row is
/// copied only when the destination does not already link the same target,
/// so re-running against the same destination creates nothing new.
pub async fn associate_event<Tx>(
    tx: &mut Tx,
    source_event_id: DbId,
    destination: &Event,
    operation: CloneOperation,
) -> Result<AssociationOutcome, CloneError>
where
    Tx: AssociationTx,
{
    if source_event_id == destination.id {
        return Err(CloneError::Validation(format!(
            "Event {source_event_id} cannot be copied onto itself"
        )));
    }

    let mut categories = Vec::with_capacity(AssociationKind::ALL.len());
    for kind in AssociationKind::ALL {
        let copy = copy_category(tx, kind, source_event_id, destination.id).await?;
        tracing::debug!(
            kind = %kind,
            source_event_id,
            destination_event_id = destination.id,
            created = copy.created_target_ids.len(),
            skipped = copy.skipped,
            "Copied associations"
        );
        categories.push(copy);
    }

    Ok(AssociationOutcome {
        source_event_id,
        destination_event_id: destination.id,
        operation,
        categories,
    })
}

async fn copy_category<Tx>(
    tx: &mut Tx,
    kind: AssociationKind,
    source_event_id: DbId,
    destination_event_id: DbId,
) -> Result<CategoryCopy, CloneError>
where
    Tx: AssociationTx,
{
    let source_links = tx.list_links(kind, source_event_id).await?;
    let mut linked: HashSet<DbId> = tx
        .list_links(kind, destination_event_id)
        .await?
        .into_iter()
        .map(|link| link.target_id)
        .collect();

    let mut copy = CategoryCopy {
        kind,
        created_target_ids: Vec::new(),
        skipped: 0,
        id_mapping: IdMapping::new(),
    };

    for link in source_links {
        // `insert` also collapses duplicate targets within the source.
        if !linked.insert(link.target_id) {
            copy.skipped += 1;
            continue;
        }

        let new_link = retarget(&link, destination_event_id)?;
        let created = tx.insert_link(kind, &new_link).await?;
        copy.id_mapping.insert(link.id, created.id);
        copy.created_target_ids.push(created.target_id);
    }

    Ok(copy)
}

/// Turn a source join row into an insertable row for `destination_event_id`.
fn retarget(
    link: &AssociationLink,
    destination_event_id: DbId,
) -> Result<NewAssociationLink, CloneError> {
    let mut plain = create_plain_object(link, true)?;
    plain.insert(
        "event_id".to_string(),
        serde_json::Value::from(destination_event_id),
    );
    Ok(serde_json::from_value(serde_json::Value::Object(plain))?)
}

// ---------------------------------------------------------------------------
// Disassociation
// ---------------------------------------------------------------------------

/// Remove every association of `event_id` across all categories.
///
/// Tasks of the event that referenced a removed department or incident
/// division have that reference set to `NULL`.
pub async fn disassociate_event<Tx>(
    tx: &mut Tx,
    event_id: DbId,
) -> Result<DisassociationOutcome, CloneError>
where
    Tx: AssociationTx,
{
    let mut categories = Vec::with_capacity(AssociationKind::ALL.len());
    for kind in AssociationKind::ALL {
        let removed_target_ids = tx.delete_links(kind, event_id).await?;

        let detached_tasks = if kind.task_column().is_some() && !removed_target_ids.is_empty() {
            tx.detach_tasks(kind, event_id, &removed_target_ids).await?
        } else {
            0
        };

        tracing::debug!(
            kind = %kind,
            event_id,
            removed = removed_target_ids.len(),
            detached_tasks,
            "Removed associations"
        );

        categories.push(CategoryRemoval {
            kind,
            removed_target_ids,
            detached_tasks,
        });
    }

    Ok(DisassociationOutcome {
        event_id,
        categories,
    })
}
