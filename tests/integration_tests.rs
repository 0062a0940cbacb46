mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use common::{monday_at, TestApp};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_full_lesson_lifecycle() {
    let app = TestApp::new().await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;

    // Browse slots for next Monday
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/instructors/inst-1/slots?date=2030-01-07&duration_min=60")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let slots = parse_body(response).await;
    assert_eq!(slots["slots"].as_array().unwrap().len(), 4);

    // Book 09:00
    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    assert_eq!(response.status(), StatusCode::OK);
    let booking = parse_body(response).await;
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(booking["payment_status"], "PENDING");
    assert_eq!(booking["price"], 5000);
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let end_at: DateTime<Utc> = booking["end_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(end_at, monday_at(10, 0));

    // Payment collaborator was told about the new booking
    assert_eq!(*app.payments.created.lock().unwrap(), vec![booking_id.clone()]);

    // Instructor confirms
    let response = app.post_action(&booking_id, "confirm", "inst-1", "instructor", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response).await["status"], "CONFIRMED");

    // Start within the grace period before the scheduled time
    app.clock.set(monday_at(8, 50));
    let response = app.post_action(&booking_id, "start", "inst-1", "instructor", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let started = parse_body(response).await;
    assert_eq!(started["status"], "CONFIRMED");
    assert!(!started["started_at"].is_null());

    // Complete after the lesson
    app.clock.set(monday_at(10, 0));
    let response = app.post_action(&booking_id, "complete", "student-1", "student", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let completed = parse_body(response).await;
    assert_eq!(completed["status"], "COMPLETED");
    assert!(!completed["completed_at"].is_null());

    // Replaying the transition is rejected with the current state
    let response = app.post_action(&booking_id, "complete", "student-1", "student", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_body(response).await;
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert!(body["error"].as_str().unwrap().contains("COMPLETED"));
}

#[tokio::test]
async fn test_auto_confirm_skips_pending() {
    let app = TestApp::with_auto_confirm(true).await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;

    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response).await["status"], "CONFIRMED");
}

#[tokio::test]
async fn test_payment_callback_updates_status() {
    let app = TestApp::new().await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;

    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    let booking_id = parse_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/bookings/{}/payment", booking_id))
                .header("content-type", "application/json")
                .header("x-payment-token", "test-token-1")
                .body(Body::from(json!({ "status": "PAID" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_body(response).await["payment_status"], "PAID");
}

#[tokio::test]
async fn test_payment_callback_rejects_bad_token() {
    let app = TestApp::new().await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;

    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    let booking_id = parse_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/bookings/{}/payment", booking_id))
                .header("content-type", "application/json")
                .header("x-payment-token", "wrong")
                .body(Body::from(json!({ "status": "PAID" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_outage_does_not_block_booking() {
    let app = TestApp::new().await;
    app.seed_window("inst-1", 0, "08:00", "12:00").await;
    app.payments.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let response = app.create_booking("student-1", "inst-1", monday_at(9, 0), 60).await;
    assert_eq!(response.status(), StatusCode::OK, "booking must survive a payment outage");

    let booking = parse_body(response).await;
    assert_eq!(booking["status"], "PENDING");
}

#[tokio::test]
async fn test_requests_without_identity_headers_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/bookings")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "instructor_id": "inst-1",
                        "scheduled_at": "2030-01-07T09:00:00Z",
                        "duration_min": 60
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/bookings")
                .header("x-actor-id", "student-1")
                .header("x-actor-role", "pilot")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "unknown role is rejected");
}
