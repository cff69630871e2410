//! Plain entity structs shared by every layer.
//!
//! The database crate maps its `FromRow` rows into these types so the
//! clone algorithms never see `sqlx`.

use serde::{Deserialize, Serialize};

use crate::clone::CloneOperation;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The aggregate root that departments, incident types and incident
/// divisions are attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub cloning_in_progress: bool,
    pub importing_in_progress: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    /// Whether a clone or an import currently holds this event.
    pub fn is_busy(&self) -> bool {
        self.cloning_in_progress || self.importing_in_progress
    }

    /// Whether the guard flag for `operation` is set.
    pub fn in_progress(&self, operation: CloneOperation) -> bool {
        match operation {
            CloneOperation::Clone => self.cloning_in_progress,
            CloneOperation::Import => self.importing_in_progress,
        }
    }
}

/// Input for creating a new event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub company_id: DbId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Association links
// ---------------------------------------------------------------------------

/// A row from one of the event join tables.
///
/// `target_id` is the department, incident type or incident division id
/// depending on the [`AssociationKind`](crate::association::AssociationKind)
/// the row was read for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationLink {
    pub id: DbId,
    pub event_id: DbId,
    pub target_id: DbId,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A join row ready for insertion.
///
/// Built from a copied [`AssociationLink`] with its identity stripped;
/// `old_id` remembers which source row it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssociationLink {
    pub event_id: DbId,
    pub target_id: DbId,
    #[serde(default)]
    pub created_by: Option<DbId>,
    #[serde(default)]
    pub old_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A staffing task scheduled within an event.
///
/// Its department and incident division references are nulled when the
/// corresponding association is removed from the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DbId,
    pub event_id: DbId,
    pub name: String,
    pub department_id: Option<DbId>,
    pub incident_division_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Acting user
// ---------------------------------------------------------------------------

/// The user on whose behalf a clone or import runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUser {
    pub id: DbId,
    pub role: String,
}
