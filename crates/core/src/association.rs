//! Association categories linking an event to its classification data.
//!
//! Every category is a many-to-many join table between `events` and a
//! company-owned lookup table. The handler walks them in the fixed order
//! of [`AssociationKind::ALL`].

use serde::{Deserialize, Serialize};

use crate::channels;

/// One of the three classification categories attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    Department,
    IncidentType,
    IncidentDivision,
}

impl AssociationKind {
    /// Processing order: departments, then incident types, then incident divisions.
    pub const ALL: [AssociationKind; 3] = [
        AssociationKind::Department,
        AssociationKind::IncidentType,
        AssociationKind::IncidentDivision,
    ];

    /// Singular label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::IncidentType => "incident_type",
            Self::IncidentDivision => "incident_division",
        }
    }

    /// Join table holding the `(event_id, target_id)` pairs.
    pub fn join_table(self) -> &'static str {
        match self {
            Self::Department => "event_departments",
            Self::IncidentType => "event_incident_types",
            Self::IncidentDivision => "event_incident_divisions",
        }
    }

    /// Foreign-key column in the join table pointing at the target row.
    pub fn target_column(self) -> &'static str {
        match self {
            Self::Department => "department_id",
            Self::IncidentType => "incident_type_id",
            Self::IncidentDivision => "incident_division_id",
        }
    }

    /// Nullable `tasks` column that references the target, if any.
    ///
    /// Removing an association nulls this column on the event's tasks.
    /// Incident types are not referenced by tasks.
    pub fn task_column(self) -> Option<&'static str> {
        match self {
            Self::Department => Some("department_id"),
            Self::IncidentType => None,
            Self::IncidentDivision => Some("incident_division_id"),
        }
    }

    /// Channel notified when targets of this kind are attached.
    pub fn associate_channel(self) -> &'static str {
        match self {
            Self::Department => channels::ASSOCIATE_DEPARTMENTS,
            Self::IncidentType => channels::ASSOCIATE_INCIDENT_TYPES,
            Self::IncidentDivision => channels::ASSOCIATE_INCIDENT_DIVISIONS,
        }
    }

    /// Channel notified when targets of this kind are detached.
    pub fn disassociate_channel(self) -> &'static str {
        match self {
            Self::Department => channels::DISASSOCIATE_DEPARTMENTS,
            Self::IncidentType => channels::DISASSOCIATE_INCIDENT_TYPES,
            Self::IncidentDivision => channels::DISASSOCIATE_INCIDENT_DIVISIONS,
        }
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
