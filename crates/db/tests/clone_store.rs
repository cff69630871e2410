//! Integration tests for the PostgreSQL clone store and job queue.
//!
//! Need a running database (`DATABASE_URL`); run with `--ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use muster_core::association::AssociationKind;
use muster_core::clone::processor::NoopNotifier;
use muster_core::clone::{CloneError, CloneOperation, CloneProcessor, EventCatalog};
use muster_core::domain::{Event, JobUser};
use muster_core::jobs::{CloneJobKind, CloneJobPayload, ImportMode, JobQueue, JobStatus};
use muster_core::types::DbId;
use muster_db::repositories::{EventRepo, TaskRepo};
use muster_db::{PgCloneStore, PgJobQueue};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_event(pool: &PgPool, name: &str) -> Event {
    EventRepo::create(pool, 1, name).await.unwrap().into()
}

async fn new_target(pool: &PgPool, kind: AssociationKind, name: &str) -> DbId {
    let table = match kind {
        AssociationKind::Department => "departments",
        AssociationKind::IncidentType => "incident_types",
        AssociationKind::IncidentDivision => "incident_divisions",
    };
    sqlx::query_scalar(&format!(
        "INSERT INTO {table} (company_id, name) VALUES (1, $1) RETURNING id"
    ))
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn link(pool: &PgPool, kind: AssociationKind, event_id: DbId, target_id: DbId) {
    sqlx::query(&format!(
        "INSERT INTO {} (event_id, {}) VALUES ($1, $2)",
        kind.join_table(),
        kind.target_column()
    ))
    .bind(event_id)
    .bind(target_id)
    .execute(pool)
    .await
    .unwrap();
}

async fn targets(pool: &PgPool, kind: AssociationKind, event_id: DbId) -> Vec<DbId> {
    sqlx::query_scalar(&format!(
        "SELECT {} FROM {} WHERE event_id = $1 ORDER BY 1",
        kind.target_column(),
        kind.join_table()
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

fn payload(source: &Event, destination: &Event, mode: ImportMode) -> CloneJobPayload {
    CloneJobPayload {
        id: source.id,
        new_event: destination.clone(),
        user: JobUser {
            id: 5,
            role: "admin".to_string(),
        },
        import_mode: mode,
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn guard_is_a_compare_and_set(pool: PgPool) {
    let store = PgCloneStore::new(pool.clone());
    let event = new_event(&pool, "Summit").await;

    assert!(store.try_acquire_guard(event.id, CloneOperation::Clone).await.unwrap());
    assert!(!store.try_acquire_guard(event.id, CloneOperation::Import).await.unwrap());

    store.release_guard(event.id, CloneOperation::Clone).await.unwrap();
    assert!(store.try_acquire_guard(event.id, CloneOperation::Import).await.unwrap());

    let missing = store.try_acquire_guard(999_999, CloneOperation::Clone).await;
    assert_matches!(missing, Err(CloneError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn event_names_match_base_literally(pool: PgPool) {
    let store = PgCloneStore::new(pool.clone());
    new_event(&pool, "100% Summit").await;
    new_event(&pool, "100% Summit [Clone 1]").await;
    new_event(&pool, "[Clone 4] 100% Summit").await;
    new_event(&pool, "1000 Summit").await;

    let names = store.list_event_names(1, "100% Summit").await.unwrap();

    assert_eq!(
        names,
        vec!["100% Summit", "100% Summit [Clone 1]", "[Clone 4] 100% Summit"]
    );
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn replace_import_swaps_associations_and_detaches_tasks(pool: PgPool) {
    let store = Arc::new(PgCloneStore::new(pool.clone()));
    let ops = new_target(&pool, AssociationKind::Department, "Ops").await;
    let medical = new_target(&pool, AssociationKind::Department, "Medical").await;
    let source = new_event(&pool, "Summit").await;
    let destination = new_event(&pool, "Expo").await;
    link(&pool, AssociationKind::Department, source.id, ops).await;
    link(&pool, AssociationKind::Department, destination.id, medical).await;
    let task = TaskRepo::create(&pool, destination.id, "First aid", Some(medical), None)
        .await
        .unwrap();

    let processor = CloneProcessor::new(Arc::clone(&store), Arc::new(NoopNotifier));
    let report = processor
        .process(
            CloneJobKind::ImportAssociation,
            &payload(&source, &destination, ImportMode::Replace),
        )
        .await
        .unwrap();

    assert_eq!(report.association.total_created(), 1);
    assert_eq!(
        targets(&pool, AssociationKind::Department, destination.id).await,
        vec![ops]
    );
    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.department_id, None);
    let reloaded = store.find_event(destination.id).await.unwrap().unwrap();
    assert!(!reloaded.is_busy());
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn one_live_job_per_destination(pool: PgPool) {
    let queue = PgJobQueue::new(pool.clone());
    let source = new_event(&pool, "Summit").await;
    let destination = new_event(&pool, "Expo").await;
    let job_payload = payload(&source, &destination, ImportMode::Merge);

    let job = queue
        .enqueue(CloneJobKind::ImportAssociation, &job_payload)
        .await
        .unwrap();
    let second = queue
        .enqueue(CloneJobKind::ImportAssociation, &job_payload)
        .await;
    assert_matches!(
        second,
        Err(CloneError::AlreadyInProgress {
            operation: CloneOperation::Import,
            ..
        })
    );

    let claimed = queue.claim_next("worker-0").await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);
    assert_eq!(claimed.status, JobStatus::Active);
    assert_eq!(claimed.payload.import_mode, ImportMode::Merge);

    queue.complete(job.id, &serde_json::json!({})).await.unwrap();
    queue
        .enqueue(CloneJobKind::ImportAssociation, &job_payload)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn illegal_transition_is_reported(pool: PgPool) {
    let queue = PgJobQueue::new(pool.clone());
    let source = new_event(&pool, "Summit").await;
    let destination = new_event(&pool, "Expo").await;
    let job = queue
        .enqueue(
            CloneJobKind::EventAssociation,
            &payload(&source, &destination, ImportMode::Replace),
        )
        .await
        .unwrap();

    assert_matches!(
        queue.complete(job.id, &serde_json::json!({})).await,
        Err(CloneError::Queue(_))
    );
    assert_matches!(
        queue.fail(999_999, "boom").await,
        Err(CloneError::NotFound { .. })
    );
}
