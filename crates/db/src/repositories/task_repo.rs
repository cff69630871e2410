//! Repository for the `tasks` table.

use muster_core::association::AssociationKind;
use muster_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::task::TaskRow;

/// Column list for `tasks` queries.
const COLUMNS: &str = "id, event_id, name, department_id, incident_division_id";

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(
        pool: &PgPool,
        event_id: DbId,
        name: &str,
        department_id: Option<DbId>,
        incident_division_id: Option<DbId>,
    ) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (event_id, name, department_id, incident_division_id) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(event_id)
            .bind(name)
            .bind(department_id)
            .bind(incident_division_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Null the `kind` column on the event's tasks pointing at `target_ids`.
    ///
    /// Returns `0` without touching the database for kinds tasks do not
    /// reference.
    pub async fn detach(
        conn: &mut PgConnection,
        kind: AssociationKind,
        event_id: DbId,
        target_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let Some(column) = kind.task_column() else {
            return Ok(0);
        };
        let query = format!(
            "UPDATE tasks SET {column} = NULL, updated_at = NOW() \
             WHERE event_id = $1 AND {column} = ANY($2)"
        );
        let result = sqlx::query(&query)
            .bind(event_id)
            .bind(target_ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
