use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{availability, booking, booking_management, health, stream};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Instructor schedule
        .route("/api/v1/instructors/{instructor_id}/availability", post(availability::add_window).get(availability::list_windows))
        .route("/api/v1/instructors/{instructor_id}/availability/{window_id}", delete(availability::remove_window))
        .route("/api/v1/instructors/{instructor_id}/slots", get(availability::get_slots))

        // Bookings
        .route("/api/v1/bookings", post(booking::create_booking).get(booking::list_bookings))
        .route("/api/v1/bookings/{booking_id}", get(booking::get_booking))
        .route("/api/v1/bookings/{booking_id}/confirm", post(booking_management::confirm_booking))
        .route("/api/v1/bookings/{booking_id}/start", post(booking_management::start_booking))
        .route("/api/v1/bookings/{booking_id}/complete", post(booking_management::complete_booking))
        .route("/api/v1/bookings/{booking_id}/cancel", post(booking_management::cancel_booking))

        // Reschedule negotiation
        .route("/api/v1/bookings/{booking_id}/reschedule", post(booking_management::request_reschedule))
        .route("/api/v1/bookings/{booking_id}/reschedule/respond", post(booking_management::respond_reschedule))
        .route("/api/v1/bookings/{booking_id}/reschedule/cancel", post(booking_management::cancel_reschedule))

        // Payment collaborator callback
        .route("/api/v1/bookings/{booking_id}/payment", post(booking::record_payment))

        // Push channel
        .route("/api/v1/stream", get(stream::stream))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        actor_id = tracing::field::Empty,
                        actor_role = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
