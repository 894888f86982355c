// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end fall detection and recording through the API.

use axum::http::StatusCode;
use becareful::db::DocumentStore;
use becareful::services::{AccelSample, MotionClassifier, MotionEvent, MotionState};
use serde_json::json;

mod common;
use common::{create_test_app, json_body, send, sign_in};

fn sample(x: f64, y: f64, z: f64, t: u64) -> serde_json::Value {
    json!({ "x": x, "y": y, "z": z, "timestamp_ms": t })
}

fn resting(t: u64) -> serde_json::Value {
    sample(0.0, 0.0, 9.8, t)
}

fn weightless(t: u64) -> serde_json::Value {
    sample(0.0, 0.5, 0.5, t)
}

/// Magnitude 20
fn impact(t: u64) -> serde_json::Value {
    sample(12.0, 16.0, 0.0, t)
}

/// Magnitude 16
fn bounce(t: u64) -> serde_json::Value {
    sample(0.0, 16.0, 0.0, t)
}

#[tokio::test]
async fn detected_fall_is_recorded_after_bounce_window() {
    let (app, _, store) = create_test_app();
    sign_in(&app, "u1").await;

    // One second of free fall, then impact
    let response = send(
        &app,
        "POST",
        "/api/motion/samples",
        "u1",
        Some(json!({ "samples": [resting(0), weightless(100), impact(1100)] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "awaiting_confirmation");
    assert_eq!(body["events"][0]["type"], "fall_detected");
    let distance = body["events"][0]["distance_m"].as_f64().unwrap();
    assert!((distance - 4.9).abs() < 1e-9);

    let response = send(
        &app,
        "POST",
        "/api/motion/confirm",
        "u1",
        Some(json!({ "timestamp_ms": 1200 })),
    )
    .await;
    assert_eq!(json_body(response).await["state"], "bounce_window");

    let response = send(
        &app,
        "POST",
        "/api/motion/samples",
        "u1",
        Some(json!({ "samples": [bounce(1300), resting(1400), bounce(1500), resting(3300)] })),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["state"], "idle");
    let closed = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "bounce_window_closed")
        .expect("window closed");
    assert_eq!(closed["bounces"], 2);

    let falls = store.list_falls("u1", None).await.unwrap();
    assert_eq!(falls.len(), 1);
    assert_eq!(falls[0].bounces, 2);
    assert!(!falls[0].notable);

    let stats = store
        .get_profile("u1")
        .await
        .unwrap()
        .unwrap()
        .stats_or_default();
    assert_eq!(stats.total_drops, 1);
    assert_eq!(stats.total_bounces, 2);
    assert!((stats.total_distance - 4.9).abs() < 1e-9);

    let inbox = store.list_notifications("u1").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "Fall recorded!");
    assert_eq!(
        inbox[0].body,
        "You dropped your phone from 4.90m with 2 bounces."
    );
}

#[tokio::test]
async fn rejected_fall_persists_nothing() {
    let (app, _, store) = create_test_app();
    sign_in(&app, "u1").await;

    send(
        &app,
        "POST",
        "/api/motion/simulate",
        "u1",
        Some(json!({ "distance_m": 1.5 })),
    )
    .await;
    let response = send(&app, "POST", "/api/motion/reject", "u1", None).await;
    assert_eq!(json_body(response).await["state"], "idle");

    assert_eq!(store.calls("add_fall"), 0);
    assert_eq!(store.calls("increment_stats"), 0);
}

#[tokio::test]
async fn confirm_without_pending_fall_is_bad_request() {
    let (app, _, _) = create_test_app();
    sign_in(&app, "u1").await;

    let response = send(
        &app,
        "POST",
        "/api/motion/confirm",
        "u1",
        Some(json!({ "timestamp_ms": 10 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tick_closes_window_when_samples_stop() {
    let (app, _, store) = create_test_app();
    sign_in(&app, "u1").await;

    send(
        &app,
        "POST",
        "/api/motion/simulate",
        "u1",
        Some(json!({ "distance_m": 0.8 })),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/motion/confirm",
        "u1",
        Some(json!({ "timestamp_ms": 5000 })),
    )
    .await;

    let response = send(
        &app,
        "POST",
        "/api/motion/tick",
        "u1",
        Some(json!({ "timestamp_ms": 7001 })),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["events"][0]["type"], "bounce_window_closed");
    assert_eq!(body["events"][0]["bounces"], 0);
    assert_eq!(store.list_falls("u1", None).await.unwrap().len(), 1);
}

#[test]
fn each_bounce_window_counts_from_zero() {
    let mut classifier = MotionClassifier::default();
    let bounce = |t| AccelSample::new(0.0, 16.0, 0.0, t);

    for (start, bounces) in [(0u64, 3u32), (10_000, 1)] {
        classifier.simulate_fall(1.0);
        classifier.confirm(start).unwrap();
        for i in 0..bounces {
            classifier.process(&bounce(start + 100 + u64::from(i) * 100));
        }
        let closed = classifier.tick(start + 2001);
        assert_eq!(
            closed,
            Some(MotionEvent::BounceWindowClosed {
                distance_m: 1.0,
                bounces
            })
        );
        assert_eq!(classifier.state(), &MotionState::Idle);
    }
}

#[test]
fn sample_at_window_edge_still_counts() {
    let mut classifier = MotionClassifier::default();
    classifier.simulate_fall(2.0);
    classifier.confirm(0).unwrap();

    assert_eq!(
        classifier.process(&AccelSample::new(0.0, 16.0, 0.0, 2000)),
        Some(MotionEvent::Bounce { count: 1 })
    );
    // First sample past the window closes it and is not counted
    assert_eq!(
        classifier.process(&AccelSample::new(0.0, 16.0, 0.0, 2001)),
        Some(MotionEvent::BounceWindowClosed {
            distance_m: 2.0,
            bounces: 1
        })
    );
}

#[tokio::test]
async fn notable_falls_and_history_endpoints() {
    let (app, _, _) = create_test_app();
    sign_in(&app, "u1").await;

    let response = send(
        &app,
        "POST",
        "/api/falls",
        "u1",
        Some(json!({ "height": 1.2, "bounces": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/falls/notable",
        "u1",
        Some(json!({ "note": "Down the stairs", "height": 1.2, "bounces": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/falls/notable",
        "u1",
        Some(json!({ "note": "x".repeat(281), "height": 1.2, "bounces": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/api/falls", "u1", None).await;
    let body = json_body(response).await;
    assert_eq!(body["falls"].as_array().unwrap().len(), 1);
    assert_eq!(body["years"].as_array().unwrap().len(), 1);

    let response = send(&app, "GET", "/api/falls/notable", "u1", None).await;
    let notable = json_body(response).await;
    assert_eq!(notable[0]["note"], "Down the stairs");

    let response = send(&app, "GET", "/api/falls/count?period=weeks&count=1", "u1", None).await;
    assert_eq!(json_body(response).await["count"], 1);

    let response = send(
        &app,
        "GET",
        "/api/falls/chart?metric=drops&grouping=monthly",
        "u1",
        None,
    )
    .await;
    let chart = json_body(response).await;
    assert_eq!(chart[0]["value"], 1.0);
}

#[tokio::test]
async fn huge_count_window_counts_every_fall() {
    let (app, _, _) = create_test_app();
    sign_in(&app, "u1").await;
    send(
        &app,
        "POST",
        "/api/falls",
        "u1",
        Some(json!({ "height": 0.5, "bounces": 0 })),
    )
    .await;

    for period in ["weeks", "months"] {
        let response = send(
            &app,
            "GET",
            &format!("/api/falls/count?period={}&count=4294967295", period),
            "u1",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["count"], 1);
    }
}

#[tokio::test]
async fn negative_height_is_rejected() {
    let (app, _, store) = create_test_app();
    sign_in(&app, "u1").await;

    let response = send(
        &app,
        "POST",
        "/api/falls",
        "u1",
        Some(json!({ "height": -3.0, "bounces": 0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.calls("increment_stats"), 0);
}
