//! Join-table row model shared by all association categories.

use muster_core::domain::AssociationLink;
use muster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `event_departments`, `event_incident_types` or
/// `event_incident_divisions`.
///
/// The category-specific foreign key is selected as `target_id`.
#[derive(Debug, Clone, FromRow)]
pub struct AssociationRow {
    pub id: DbId,
    pub event_id: DbId,
    pub target_id: DbId,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<AssociationRow> for AssociationLink {
    fn from(row: AssociationRow) -> Self {
        AssociationLink {
            id: row.id,
            event_id: row.event_id,
            target_id: row.target_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
