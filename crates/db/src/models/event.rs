//! Event entity model.

use muster_core::domain::Event;
use muster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub cloning_in_progress: bool,
    pub importing_in_progress: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            cloning_in_progress: row.cloning_in_progress,
            importing_in_progress: row.importing_in_progress,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
