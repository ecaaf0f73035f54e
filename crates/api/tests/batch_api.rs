//! Integration tests for the `/api/v1/batches` routes.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, post, post_json, TestApp};
use serde_json::json;
use storyreel_core::batch::BatchStatus;

async fn create_batch(app: &TestApp, texts: &[&str]) -> String {
    let items: Vec<_> = texts.iter().map(|t| json!({ "text": t })).collect();
    let response = post_json(app, "/api/v1/batches", json!({ "name": "Shorts", "items": items })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["batch_id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Create / analyze
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_estimate() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches",
        json!({
            "name": "Shorts",
            "items": [
                { "title": "Intro", "text": "one two three" },
                { "text": "   " },
                { "text": "four five" }
            ],
            "channel_id": "history"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["total_items"], 2);
    assert_eq!(json["data"]["message"], "Batch created with 2 scripts");
    assert!(json["data"]["estimated_total_duration_seconds"].as_f64().unwrap() > 0.0);

    let id = json["data"]["batch_id"].as_str().unwrap();
    let batch = app.batches.get(id).unwrap();
    assert_eq!(batch.items[0].title, "Intro");
    assert_eq!(batch.items[1].title, "Script 2");
    assert_eq!(batch.channel_id.as_deref(), Some("history"));
}

#[tokio::test]
async fn create_without_items_is_rejected() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/batches", json!({ "name": "Empty", "items": [] })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "No scripts provided");
}

#[tokio::test]
async fn oversized_script_rejects_the_whole_batch() {
    let app = build_test_app();
    let huge = "a".repeat(50_001);
    let response = post_json(
        &app,
        "/api/v1/batches",
        json!({ "name": "Big", "items": [{ "text": "fine" }, { "title": "Huge", "text": huge }] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.batches.store().is_empty());
}

#[tokio::test]
async fn analyze_reports_per_item_estimates() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/analyze",
        json!({ "name": "Plan", "items": [{ "text": "a b c" }, { "text": "" }] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total_items"], 2);
    assert_eq!(json["data"]["total_words"], 3);
    assert_eq!(json["data"]["items_analysis"][1]["error"], "empty text");
    assert!(app.batches.store().is_empty());
}

// ---------------------------------------------------------------------------
// Get / list / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_unknown_batch_returns_404() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/batches/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_shows_the_running_item() {
    let app = build_test_app();
    let id = create_batch(&app, &["first", "second"]).await;
    app.wait_for_running_item(&id).await;

    let response = get(&app, &format!("/api/v1/batches/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["batch_id"], id.as_str());
    assert_eq!(json["data"]["status"], "processing");
    assert_eq!(json["data"]["current_item_index"], 0);
    assert_eq!(json["data"]["items"][0]["status"], "processing");
    assert_eq!(json["data"]["items"][0]["id"], format!("{id}_0"));
    assert_eq!(json["data"]["items"][1]["status"], "pending");
}

#[tokio::test]
async fn list_filters_and_validates_limit() {
    let app = build_test_app();
    let running = create_batch(&app, &["a"]).await;
    app.wait_for_running_item(&running).await;

    let response = get(&app, "/api/v1/batches").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["batches"][0]["batch_id"], running.as_str());

    let response = get(&app, "/api/v1/batches?status=completed").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["batches"].as_array().unwrap().len(), 0);

    let response = get(&app, "/api/v1/batches?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn delete_removes_a_running_batch() {
    let app = build_test_app();
    let id = create_batch(&app, &["a", "b"]).await;
    app.wait_for_running_item(&id).await;

    let response = delete(&app, &format!("/api/v1/batches/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/api/v1/batches/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(&app, &format!("/api/v1/batches/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Pause / resume / cancel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pause_takes_effect_after_the_running_item() {
    let app = build_test_app();
    let id = create_batch(&app, &["a", "b"]).await;
    app.wait_for_running_item(&id).await;

    let response = post(&app, &format!("/api/v1/batches/{id}/pause")).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Let item 0 finish; the batch then holds before item 1.
    app.release_items();
    app.wait_for_status(&id, BatchStatus::Paused).await;

    let batch = app.batches.get(&id).unwrap();
    assert_eq!(batch.current_item_index, 1);
    assert_eq!(batch.completed_items, 1);

    let response = post(&app, &format!("/api/v1/batches/{id}/pause")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post(&app, &format!("/api/v1/batches/{id}/resume")).await;
    assert_eq!(response.status(), StatusCode::OK);
    app.wait_for_status(&id, BatchStatus::Completed).await;
}

#[tokio::test]
async fn resume_without_pause_conflicts() {
    let app = build_test_app();
    let id = create_batch(&app, &["a"]).await;
    app.wait_for_running_item(&id).await;

    let response = post(&app, &format!("/api/v1/batches/{id}/resume")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn cancel_then_cancel_again_conflicts() {
    let app = build_test_app();
    let id = create_batch(&app, &["a", "b", "c"]).await;
    app.wait_for_running_item(&id).await;

    let response = post(&app, &format!("/api/v1/batches/{id}/cancel")).await;
    assert_eq!(response.status(), StatusCode::OK);
    app.wait_for_status(&id, BatchStatus::Cancelled).await;

    let batch = app.batches.get(&id).unwrap();
    assert_eq!(batch.skipped_items(), 3);

    let response = post(&app, &format!("/api/v1/batches/{id}/cancel")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn controls_on_a_completed_batch_conflict() {
    let app = build_test_app();
    app.release_items();
    let id = create_batch(&app, &["a"]).await;
    app.wait_for_status(&id, BatchStatus::Completed).await;

    for action in ["pause", "resume", "cancel"] {
        let response = post(&app, &format!("/api/v1/batches/{id}/{action}")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT, "{action}");
    }
}

#[tokio::test]
async fn controls_on_unknown_batch_return_404() {
    let app = build_test_app();
    let response = post(&app, "/api/v1/batches/missing/pause").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
