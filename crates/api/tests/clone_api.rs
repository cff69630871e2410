//! HTTP-level integration tests for the clone, import and clone-job endpoints.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router.
//! Events are seeded through the in-memory store, then driven through the
//! HTTP API.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_auth, post_json, token_for};
use muster_core::clone::{CloneOperation, EventCatalog};
use serde_json::json;

// ---------------------------------------------------------------------------
// POST /api/v1/events/{id}/clone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clone_creates_event_and_queues_job() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/clone", source.id),
        &token_for(9),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let event = &json["data"]["event"];
    let job = &json["data"]["job"];
    assert_eq!(event["name"], "Summit [Clone 1]");
    assert_eq!(event["company_id"], 1);
    assert_eq!(job["kind"], "eventAssociation");
    assert_eq!(job["status"], "queued");
    assert_eq!(job["destination_event_id"], event["id"]);
    assert_eq!(job["payload"]["id"], source.id);
    assert_eq!(job["payload"]["newEvent"]["id"], event["id"]);
    assert_eq!(job["payload"]["user"]["id"], 9);
}

#[tokio::test]
async fn clone_uses_explicit_name() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/clone", source.id),
        &token_for(9),
        json!({ "name": "Summit Rehearsal" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["event"]["name"], "Summit Rehearsal");
}

#[tokio::test]
async fn clone_rejects_blank_name() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/clone", source.id),
        &token_for(9),
        json!({ "name": "   " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(app.queue.all().await.is_empty());
}

#[tokio::test]
async fn clone_of_missing_event_returns_404() {
    let app = build_test_app();

    let response = post_json(
        app.router,
        "/api/v1/events/999/clone",
        &token_for(9),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Event with id 999 not found");
}

#[tokio::test]
async fn clone_without_token_returns_401() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;

    let response = get(app.router.clone(), "/api/v1/clone-jobs/active").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/clone", source.id),
        "not-a-jwt",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired token");
    assert!(app.queue.all().await.is_empty());
}

// ---------------------------------------------------------------------------
// POST /api/v1/events/{id}/import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_queues_job_with_default_mode() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;
    let destination = app.store.insert_event(1, "Expo").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/import", destination.id),
        &token_for(3),
        json!({ "source_event_id": source.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let job = &json["data"];
    assert_eq!(job["kind"], "importAssociation");
    assert_eq!(job["destination_event_id"], destination.id);
    assert_eq!(job["payload"]["id"], source.id);
    assert_eq!(job["payload"]["importMode"], "replace");
}

#[tokio::test]
async fn import_accepts_merge_mode() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;
    let destination = app.store.insert_event(1, "Expo").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/import", destination.id),
        &token_for(3),
        json!({ "source_event_id": source.id, "mode": "merge" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["payload"]["importMode"], "merge");
}

#[tokio::test]
async fn import_from_itself_returns_400() {
    let app = build_test_app();
    let event = app.store.insert_event(1, "Summit").await;

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/import", event.id),
        &token_for(3),
        json!({ "source_event_id": event.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_import_for_same_destination_returns_409() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;
    let destination = app.store.insert_event(1, "Expo").await;
    let uri = format!("/api/v1/events/{}/import", destination.id);
    let body = json!({ "source_event_id": source.id });

    let first = post_json(app.router.clone(), &uri, &token_for(3), body.clone()).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = post_json(app.router, &uri, &token_for(3), body).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["code"], "ALREADY_IN_PROGRESS");
    assert_eq!(app.queue.all().await.len(), 1);
}

#[tokio::test]
async fn import_into_guarded_event_returns_409() {
    let app = build_test_app();
    let source = app.store.insert_event(1, "Summit").await;
    let destination = app.store.insert_event(1, "Expo").await;
    app.store
        .try_acquire_guard(destination.id, CloneOperation::Clone)
        .await
        .unwrap();

    let response = post_json(
        app.router,
        &format!("/api/v1/events/{}/import", destination.id),
        &token_for(3),
        json!({ "source_event_id": source.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        format!("Event {} is locked by a running clone", destination.id)
    );
}

// ---------------------------------------------------------------------------
// GET /api/v1/clone-jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_jobs_lists_queued_work() {
    let app = build_test_app();
    let token = token_for(3);
    let response = get_auth(app.router.clone(), "/api/v1/clone-jobs/active", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    let source = app.store.insert_event(1, "Summit").await;
    post_json(
        app.router.clone(),
        &format!("/api/v1/events/{}/clone", source.id),
        &token,
        json!({}),
    )
    .await;

    let response = get_auth(app.router, "/api/v1/clone-jobs/active", &token).await;
    let json = body_json(response).await;
    let jobs = json["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["kind"], "eventAssociation");
}

#[tokio::test]
async fn job_status_by_id() {
    let app = build_test_app();
    let token = token_for(3);
    let source = app.store.insert_event(1, "Summit").await;
    let created = post_json(
        app.router.clone(),
        &format!("/api/v1/events/{}/clone", source.id),
        &token,
        json!({}),
    )
    .await;
    let job_id = body_json(created).await["data"]["job"]["id"].as_i64().unwrap();

    let response = get_auth(
        app.router.clone(),
        &format!("/api/v1/clone-jobs/{job_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], job_id);
    assert_eq!(json["data"]["status"], "queued");
    assert_eq!(json["data"]["attempts"], 0);

    let missing = get_auth(app.router, "/api/v1/clone-jobs/4242", &token).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(missing).await["error"],
        "CloneJob with id 4242 not found"
    );
}
