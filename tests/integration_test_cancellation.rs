mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{monday_at, TestApp};
use serde_json::{json, Value};

async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seeded_booking(app: &TestApp) -> String {
    app.seed_window("inst-1", 0, "08:00", "12:00").await;
    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    assert_eq!(response.status(), StatusCode::OK);
    parse_body(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_cancel_thirty_hours_ahead_refunds_half() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.clock.set(monday_at(9, 0) - Duration::hours(30));
    let response = app
        .post_action(&booking_id, "cancel", "student-1", "student", Some(json!({ "reason": "flu" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["refund_fraction"], 0.5);
    assert_eq!(body["cancelled_reason"], "flu");

    // The payment collaborator is told to refund the same fraction
    assert_eq!(
        *app.payments.cancelled.lock().unwrap(),
        vec![(booking_id.clone(), 0.5)]
    );
}

#[tokio::test]
async fn test_late_cancel_forfeits_the_fee() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.clock.set(monday_at(9, 0) - Duration::hours(2));
    let response = app.post_action(&booking_id, "cancel", "student-1", "student", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["refund_fraction"], 0.0);
    assert!(body["cancelled_reason"].is_null());
}

#[tokio::test]
async fn test_early_cancel_refunds_in_full() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.clock.set(monday_at(9, 0) - Duration::hours(48));
    let response = app.post_action(&booking_id, "cancel", "inst-1", "instructor", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response).await["refund_fraction"], 1.0);
}

#[tokio::test]
async fn test_exactly_twenty_four_hours_is_half() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.clock.set(monday_at(9, 0) - Duration::hours(24));
    let response = app.post_action(&booking_id, "cancel", "student-1", "student", None).await;
    assert_eq!(parse_body(response).await["refund_fraction"], 0.5);
}

#[tokio::test]
async fn test_refund_uses_the_rescheduled_time_after_accept() {
    let app = TestApp::new().await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;
    // Also open the following Monday so the lesson can move a week out
    let next_monday = monday_at(9, 0) + Duration::days(7);

    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    let booking_id = parse_body(response).await["id"].as_str().unwrap().to_string();

    app.post_action(
        &booking_id,
        "reschedule",
        "student-1",
        "student",
        Some(json!({ "new_scheduled_at": next_monday.to_rfc3339() })),
    )
    .await;
    app.post_action(&booking_id, "reschedule/respond", "inst-1", "instructor", Some(json!({ "accept": true })))
        .await;

    // 30h before the OLD time but more than a week before the new one
    app.clock.set(monday_at(9, 0) - Duration::hours(30));
    let response = app.post_action(&booking_id, "cancel", "student-1", "student", None).await;
    assert_eq!(
        parse_body(response).await["refund_fraction"], 1.0,
        "fraction is computed against the current scheduled time"
    );
}

#[tokio::test]
async fn test_cancel_clears_an_open_reschedule_request() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.post_action(
        &booking_id,
        "reschedule",
        "student-1",
        "student",
        Some(json!({ "new_scheduled_at": monday_at(11, 0).to_rfc3339() })),
    )
    .await;

    let response = app.post_action(&booking_id, "cancel", "inst-1", "instructor", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["status"], "CANCELLED");
    assert!(body["rescheduled_at"].is_null());
    assert!(body["rescheduled_by"].is_null());
    assert!(body["rescheduled_from"].is_null());
}

#[tokio::test]
async fn test_cancelled_booking_frees_the_slot() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.post_action(&booking_id, "cancel", "student-1", "student", None).await;

    let response = app.create_booking("student-2", "inst-1", monday_at(9, 0), 60).await;
    assert_eq!(response.status(), StatusCode::OK, "a cancelled booking no longer blocks");
}

#[tokio::test]
async fn test_terminal_bookings_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let booking_id = seeded_booking(&app).await;

    app.post_action(&booking_id, "cancel", "student-1", "student", None).await;

    let response = app.post_action(&booking_id, "cancel", "student-1", "student", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_body(response).await;
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert!(body["error"].as_str().unwrap().contains("CANCELLED"));
}
