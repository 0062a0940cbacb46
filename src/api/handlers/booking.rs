use axum::{extract::{Path, State}, http::HeaderMap, Json};
use chrono::{Datelike, Duration, NaiveTime};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::dtos::requests::{CreateBookingRequest, PaymentCallbackRequest};
use crate::api::extractors::actor::AuthActor;
use crate::domain::models::actor::ActorRole;
use crate::domain::models::booking::{Booking, NewBookingParams, PaymentStatus};
use crate::domain::models::event::EventKind;
use crate::domain::services::slots::generate_slots;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if actor.role != ActorRole::Student {
        return Err(AppError::Forbidden("only students can book lessons".into()));
    }
    if payload.duration_min <= 0 || payload.duration_min > 1440 {
        return Err(AppError::Validation("duration_min must be between 1 and 1440".into()));
    }
    if payload.price < 0 {
        return Err(AppError::Validation("price must not be negative".into()));
    }

    info!(
        "create_booking: student '{}' requesting instructor '{}' at {} for {} min",
        actor.id, payload.instructor_id, payload.scheduled_at, payload.duration_min
    );

    let now = state.clock.now();
    let date = payload.scheduled_at.date_naive();
    let weekday = date.weekday().num_days_from_monday() as i32;
    let windows = state
        .availability_repo
        .list_for_day(&payload.instructor_id, weekday)
        .await?;

    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);
    let blocking = state
        .booking_repo
        .list_blocking_in_range(&payload.instructor_id, day_start, day_end)
        .await?;

    let slots = generate_slots(&windows, date, payload.duration_min, &blocking, now);
    let requested_is_open = slots
        .iter()
        .any(|s| s.start_time == payload.scheduled_at && s.is_available);
    if !requested_is_open {
        return Err(AppError::SlotUnavailable("requested time is not an open slot".into()));
    }

    let booking = Booking::new(NewBookingParams {
        student_id: actor.id.clone(),
        instructor_id: payload.instructor_id.clone(),
        scheduled_at: payload.scheduled_at,
        duration_min: payload.duration_min,
        price: payload.price,
        confirmed: state.config.auto_confirm_bookings,
    });

    // The insert re-checks the interval against blocking bookings, so two
    // concurrent requests for the same slot cannot both get through.
    let created = state.booking_repo.create(&booking).await?;

    info!("create_booking: booking '{}' created in status {}", created.id, created.status);

    if let Err(e) = state.payment_gateway.notify_created(&created).await {
        warn!("create_booking: payment notification failed (ignored): {}", e);
    }
    state.notifier.notify(EventKind::SchedulingCreated, &created, now).await;

    Ok(Json(created))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = match actor.role {
        ActorRole::Student => state.booking_repo.list_by_student(&actor.id).await?,
        ActorRole::Instructor => state.booking_repo.list_by_instructor(&actor.id).await?,
    };
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !booking.is_party(&actor) {
        return Err(AppError::Forbidden("actor is not a party to this booking".into()));
    }

    Ok(Json(booking))
}

pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PaymentCallbackRequest>,
) -> Result<Json<Booking>, AppError> {
    let token = headers
        .get("x-payment-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token != state.config.payment_service_token {
        return Err(AppError::Unauthorized);
    }

    let status = PaymentStatus::parse(&payload.status)
        .ok_or_else(|| AppError::Validation(format!("unknown payment status '{}'", payload.status)))?;

    let updated = state
        .booking_repo
        .set_payment_status(&booking_id, status)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    info!("record_payment: booking '{}' payment status set to {}", booking_id, status.as_str());
    Ok(Json(updated))
}
