use muster_core::domain::Task;
use muster_core::types::DbId;
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: DbId,
    pub event_id: DbId,
    pub name: String,
    pub department_id: Option<DbId>,
    pub incident_division_id: Option<DbId>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            department_id: row.department_id,
            incident_division_id: row.incident_division_id,
        }
    }
}
