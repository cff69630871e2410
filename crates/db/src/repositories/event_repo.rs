//! Repository for the `events` table, including the in-progress guard flags.

use muster_core::clone::CloneOperation;
use muster_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::EventRow;

/// Column list for `events` queries.
const COLUMNS: &str = "\
    id, company_id, name, cloning_in_progress, importing_in_progress, \
    created_at, updated_at";

/// Guard column set while `operation` runs.
fn guard_column(operation: CloneOperation) -> &'static str {
    match operation {
        CloneOperation::Clone => "cloning_in_progress",
        CloneOperation::Import => "importing_in_progress",
    }
}

/// Escape `LIKE` metacharacters so `value` matches literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Provides reads, inserts and guard transitions for events.
pub struct EventRepo;

impl EventRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Names of the company's events containing `fragment` literally.
    pub async fn list_names_containing(
        pool: &PgPool,
        company_id: DbId,
        fragment: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT name FROM events \
             WHERE company_id = $1 AND name LIKE '%' || $2 || '%' ESCAPE '\\' \
             ORDER BY id",
        )
        .bind(company_id)
        .bind(escape_like(fragment))
        .fetch_all(pool)
        .await
    }

    /// Insert an event with both guard flags cleared.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        name: &str,
    ) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (company_id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(company_id)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Hard-delete an event. Join rows, tasks and jobs cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the guard flag for `operation` if neither flag is set.
    ///
    /// A single conditional `UPDATE`, so two callers can never both win.
    /// Returns `None` if the event does not exist, `Some(false)` if it is held.
    pub async fn try_acquire_guard(
        pool: &PgPool,
        id: DbId,
        operation: CloneOperation,
    ) -> Result<Option<bool>, sqlx::Error> {
        let column = guard_column(operation);
        let query = format!(
            "UPDATE events SET {column} = TRUE, updated_at = NOW() \
             WHERE id = $1 AND NOT cloning_in_progress AND NOT importing_in_progress"
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        if result.rows_affected() > 0 {
            return Ok(Some(true));
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(exists.map(|_| false))
    }

    /// Clear the guard flag for `operation`.
    pub async fn release_guard(
        pool: &PgPool,
        id: DbId,
        operation: CloneOperation,
    ) -> Result<(), sqlx::Error> {
        let column = guard_column(operation);
        let query = format!("UPDATE events SET {column} = FALSE, updated_at = NOW() WHERE id = $1");
        sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(())
    }

    /// Clear both flags on every busy event not in `held`.
    pub async fn release_stale_guards(pool: &PgPool, held: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events \
             SET cloning_in_progress = FALSE, importing_in_progress = FALSE, updated_at = NOW() \
             WHERE (cloning_in_progress OR importing_in_progress) \
               AND NOT (id = ANY($1))",
        )
        .bind(held)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
