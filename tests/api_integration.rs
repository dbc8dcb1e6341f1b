//! API integration tests for the piecework HTTP endpoints.
//!
//! Requests go straight to the Axum router through `tower::ServiceExt::oneshot`,
//! so no TCP listener is started. The router is backed by the in-memory store,
//! which makes these tests self-contained; the same routes are exercised
//! against Postgres in `db_integration.rs`.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test api_integration
//! ```
//!
//! The helpers `get()`, `post_json()` and `delete()` return
//! `(StatusCode, serde_json::Value)` tuples for concise assertions.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!(null));
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .uri(uri)
            .method("DELETE")
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn create_worker(app: &Router, name: &str) -> String {
    let (status, json) = post_json(
        app,
        "/api/workers",
        json!({"name": name, "phone_number": "9800000000"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn record(app: &Router, worker_id: &str, category: &str, quantity: i64, days_ago: i64) -> Value {
    let at = Utc::now() - chrono::Duration::days(days_ago);
    let (status, json) = post_json(
        app,
        "/api/entries",
        json!({
            "worker_id": worker_id,
            "category": category,
            "quantity": quantity,
            "recorded_at": at,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

async fn set_rate(app: &Router, category: &str, amount: &str) -> StatusCode {
    post_json(app, "/api/rates", json!({"category": category, "amount": amount}))
        .await
        .0
}

fn worker_row<'a>(stats: &'a Value, id: &str) -> &'a Value {
    stats["workers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["worker_id"] == id)
        .unwrap()
}

// == Health ====================================================================

#[tokio::test]
async fn healthz_and_readyz_return_200() {
    let app = common::build_memory_app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_exposes_ledger_counters() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("piecework_rate_upserts_total 1"));
    assert!(text.contains("piecework_http_request_duration_seconds"));
}

#[tokio::test]
async fn entry_metric_labels_by_pricing_not_category() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    let w = create_worker(&app, "Asha").await;
    record(&app, &w, "shirt", 1, 0).await;
    record(&app, &w, "kurta-custom-7", 1, 0).await;
    record(&app, &w, "kurta-custom-8", 1, 0).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"piecework_entries_recorded_total{pricing="priced"} 1"#));
    assert!(text.contains(r#"piecework_entries_recorded_total{pricing="unpriced"} 2"#));
    assert!(!text.contains("kurta-custom"));
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = common::build_memory_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

// == Rates =====================================================================

#[tokio::test]
async fn rate_upsert_creates_then_replaces() {
    let app = common::build_memory_app();
    assert_eq!(set_rate(&app, "shirt", "10").await, StatusCode::CREATED);
    assert_eq!(set_rate(&app, "shirt", "11").await, StatusCode::OK);
    assert_eq!(set_rate(&app, "pant", "15").await, StatusCode::CREATED);

    let (status, json) = get(&app, "/api/rates").await;
    assert_eq!(status, StatusCode::OK);
    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["category"], "pant");
    assert_eq!(rates[1]["category"], "shirt");
    assert_eq!(rates[1]["amount"], "11");
}

#[tokio::test]
async fn negative_rate_is_rejected() {
    let app = common::build_memory_app();
    let (status, json) = post_json(
        &app,
        "/api/rates",
        json!({"category": "shirt", "amount": "-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation");
    assert_eq!(json["field"], "amount");
}

#[tokio::test]
async fn oversized_rate_is_rejected() {
    let app = common::build_memory_app();
    for amount in ["10000000000", "70000000000000000000000000000"] {
        let (status, json) = post_json(
            &app,
            "/api/rates",
            json!({"category": "shirt", "amount": amount}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        assert_eq!(json["field"], "amount");
    }
    assert_eq!(set_rate(&app, "shirt", "9999999999.9999").await, StatusCode::CREATED);
    let (status, _) = get(&app, "/api/stats/revenue").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_body_is_validation_error() {
    let app = common::build_memory_app();
    let (status, json) = post_json(&app, "/api/rates", json!({"category": "shirt"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation");
    assert_eq!(json["field"], "body");
}

// == Entries ===================================================================

#[tokio::test]
async fn entry_validation_and_unknown_worker() {
    let app = common::build_memory_app();
    let worker = create_worker(&app, "Asha").await;

    let (status, json) = post_json(
        &app,
        "/api/entries",
        json!({"worker_id": worker, "category": "shirt", "quantity": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "quantity");

    let (status, json) = post_json(
        &app,
        "/api/entries",
        json!({"worker_id": uuid::Uuid::new_v4(), "category": "shirt", "quantity": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn delete_entry_then_404() {
    let app = common::build_memory_app();
    let worker = create_worker(&app, "Asha").await;
    let entry = record(&app, &worker, "shirt", 2, 0).await;
    let uri = format!("/api/entries/{}", entry["id"].as_str().unwrap());

    let (status, _) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (_, json) = get(&app, "/api/entries").await;
    assert!(json["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn bad_path_id_is_validation_error() {
    let app = common::build_memory_app();
    let (status, json) = delete(&app, "/api/entries/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "id");
}

#[tokio::test]
async fn entries_list_filters_by_worker_and_limit() {
    let app = common::build_memory_app();
    let a = create_worker(&app, "A").await;
    let b = create_worker(&app, "B").await;
    record(&app, &a, "shirt", 1, 2).await;
    record(&app, &a, "shirt", 2, 1).await;
    record(&app, &b, "pant", 3, 1).await;

    let (status, json) = get(&app, &format!("/api/entries?worker_id={a}")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // newest first
    assert_eq!(entries[0]["quantity"], 2);

    let (_, json) = get(&app, "/api/entries?limit=1").await;
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);

    let (status, json) = get(&app, &format!("/api/workers/{b}/entries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["worker"]["name"], "B");
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
}

// == Stats =====================================================================

#[tokio::test]
async fn weekly_stats_scenario() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    set_rate(&app, "pant", "15").await;
    let w1 = create_worker(&app, "W1").await;
    let w2 = create_worker(&app, "W2").await;
    record(&app, &w1, "shirt", 5, 3).await;
    record(&app, &w1, "pant", 2, 10).await;
    record(&app, &w2, "shirt", 3, 1).await;

    let (status, stats) = get(&app, "/api/stats/weekly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["period"], "last_7_days");
    assert_eq!(stats["total_workers"], 2);
    assert_eq!(stats["total_entries"], 2);
    assert_eq!(stats["total_revenue"], "80");

    let r1 = worker_row(&stats, &w1);
    assert_eq!(r1["total_quantity"], 5);
    assert_eq!(r1["total_earnings"], "50");
    assert_eq!(r1["entries"], 1);
    assert_eq!(r1["categories"]["shirt"]["earnings"], "50");
    let r2 = worker_row(&stats, &w2);
    assert_eq!(r2["total_earnings"], "30");
}

#[tokio::test]
async fn unknown_category_earns_zero() {
    let app = common::build_memory_app();
    let w = create_worker(&app, "W").await;
    record(&app, &w, "kurta", 4, 0).await;

    let (_, stats) = get(&app, "/api/stats?days=1").await;
    let row = worker_row(&stats, &w);
    assert_eq!(row["total_quantity"], 4);
    assert_eq!(row["total_earnings"], "0");
    assert_eq!(stats["total_revenue"], "0");
}

#[tokio::test]
async fn stats_query_validation() {
    let app = common::build_memory_app();
    let (status, json) = get(&app, "/api/stats?days=7&start=2026-01-01T00:00:00Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "days");

    let (status, json) = get(
        &app,
        "/api/stats?start=2026-02-01T00:00:00Z&end=2026-01-01T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "range");

    let (status, _) = get(&app, "/api/stats?days=seven").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_for_single_worker_and_range() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    let a = create_worker(&app, "A").await;
    let b = create_worker(&app, "B").await;
    record(&app, &a, "shirt", 1, 1).await;
    record(&app, &b, "shirt", 2, 1).await;

    let (status, stats) = get(&app, &format!("/api/stats?worker_id={a}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["period"], "all_time");
    assert_eq!(stats["total_workers"], 1);
    assert_eq!(stats["total_revenue"], "10");

    let start = (Utc::now() - chrono::Duration::days(2)).format("%Y-%m-%dT%H:%M:%SZ");
    let end = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let (status, stats) = get(&app, &format!("/api/stats?start={start}&end={end}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["period"], "range");
    assert_eq!(stats["total_revenue"], "30");
}

#[tokio::test]
async fn deleted_worker_entries_are_skipped() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    let stays = create_worker(&app, "Stays").await;
    let leaves = create_worker(&app, "Leaves").await;
    record(&app, &stays, "shirt", 1, 0).await;
    record(&app, &leaves, "shirt", 5, 0).await;

    let (status, _) = delete(&app, &format!("/api/workers/{leaves}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, &format!("/api/workers/{leaves}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, revenue) = get(&app, "/api/stats/revenue").await;
    assert_eq!(revenue["total_revenue"], "10");
    assert_eq!(revenue["total_entries"], 2);
    assert_eq!(revenue["skipped_entries"], 1);
}

#[tokio::test]
async fn rate_change_applies_to_next_aggregation() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10").await;
    let w = create_worker(&app, "W").await;
    record(&app, &w, "shirt", 3, 0).await;

    let (_, before) = get(&app, "/api/stats/revenue").await;
    set_rate(&app, "shirt", "12.5").await;
    let (_, after) = get(&app, "/api/stats/revenue").await;
    assert_eq!(before["total_revenue"], "30");
    assert_eq!(after["total_revenue"], "37.5");
}

#[tokio::test]
async fn worker_weekly_total() {
    let app = common::build_memory_app();
    set_rate(&app, "pant", "15").await;
    let w = create_worker(&app, "W").await;
    record(&app, &w, "pant", 2, 1).await;
    record(&app, &w, "pant", 9, 30).await;

    let (status, json) = get(&app, &format!("/api/workers/{w}/weekly-total")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], "30");
    assert_eq!(json["count"], 1);

    let (status, _) = get(
        &app,
        &format!("/api/workers/{}/weekly-total", uuid::Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Payouts ===================================================================

#[tokio::test]
async fn payout_lifecycle() {
    let app = common::build_memory_app();
    set_rate(&app, "shirt", "10.505").await;
    let w = create_worker(&app, "W").await;
    record(&app, &w, "shirt", 3, 1).await;

    let (status, payout) = post_json(
        &app,
        "/api/payouts",
        json!({
            "worker_id": w,
            "period_start": Utc::now() - chrono::Duration::days(7),
            "period_end": Utc::now(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{payout}");
    assert_eq!(payout["amount"], "31.515");
    assert_eq!(payout["amount_minor"], 3152);
    assert_eq!(payout["status"], "pending");

    let uri = format!("/api/payouts/{}/paid", payout["id"].as_str().unwrap());
    let (status, json) = post_json(&app, &uri, json!({"method": "gateway"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["field"], "gateway_ref");

    let (status, paid) = post_json(
        &app,
        &uri,
        json!({"method": "gateway", "gateway_ref": "pay_123"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["method"], "gateway");
    assert_eq!(paid["gateway_ref"], "pay_123");

    let (_, list) = get(&app, "/api/payouts").await;
    assert_eq!(list["payouts"].as_array().unwrap().len(), 1);

    let missing = format!("/api/payouts/{}/paid", uuid::Uuid::new_v4());
    let (status, _) = post_json(&app, &missing, json!({"method": "cash"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Store failures ============================================================

#[tokio::test]
async fn slow_store_returns_503() {
    let app = common::build_slow_app(Duration::from_secs(30), Duration::from_millis(50));
    let (status, json) = get(&app, "/api/stats/weekly").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "unavailable");
    assert_eq!(json["message"], "try again");

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
