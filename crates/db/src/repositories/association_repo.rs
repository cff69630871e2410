//! Repository for the three event join tables.
//!
//! Table and column names come from [`AssociationKind`], never from input.

use muster_core::association::AssociationKind;
use muster_core::types::DbId;
use sqlx::PgConnection;

use crate::models::association::AssociationRow;

/// Select list aliasing the category column to `target_id`.
fn columns(kind: AssociationKind) -> String {
    format!(
        "id, event_id, {} AS target_id, created_by, created_at, updated_at",
        kind.target_column()
    )
}

/// Join-row reads and writes, always inside a caller's transaction.
pub struct AssociationRepo;

impl AssociationRepo {
    pub async fn list_for_event(
        conn: &mut PgConnection,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<AssociationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE event_id = $1 ORDER BY id",
            columns(kind),
            kind.join_table()
        );
        sqlx::query_as::<_, AssociationRow>(&query)
            .bind(event_id)
            .fetch_all(conn)
            .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        kind: AssociationKind,
        event_id: DbId,
        target_id: DbId,
        created_by: Option<DbId>,
    ) -> Result<AssociationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (event_id, {}, created_by) VALUES ($1, $2, $3) RETURNING {}",
            kind.join_table(),
            kind.target_column(),
            columns(kind)
        );
        sqlx::query_as::<_, AssociationRow>(&query)
            .bind(event_id)
            .bind(target_id)
            .bind(created_by)
            .fetch_one(conn)
            .await
    }

    /// Delete every row of `kind` for the event, returning the removed target ids.
    pub async fn delete_for_event(
        conn: &mut PgConnection,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE event_id = $1 RETURNING {}",
            kind.join_table(),
            kind.target_column()
        );
        sqlx::query_scalar(&query)
            .bind(event_id)
            .fetch_all(conn)
            .await
    }
}
