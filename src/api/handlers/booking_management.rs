use axum::{extract::{Path, State}, Json};
use chrono::{Datelike, Duration, NaiveTime};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::dtos::requests::{CancelBookingRequest, RescheduleRequest, RescheduleResponseRequest};
use crate::api::extractors::actor::AuthActor;
use crate::domain::models::booking::{Booking, BookingStatus};
use crate::domain::models::event::EventKind;
use crate::domain::services::slots::generate_slots;
use crate::error::AppError;
use crate::state::AppState;

/// A conditional update that matched nothing means the row moved under us.
/// Re-read it to report the status the booking actually has now.
async fn stale_transition_error(
    state: &AppState,
    booking_id: &str,
    attempted: &'static str,
) -> AppError {
    match state.booking_repo.find_by_id(booking_id).await {
        Ok(Some(current)) => AppError::InvalidTransition { current: current.status, attempted },
        Ok(None) => AppError::NotFound("Booking not found".into()),
        Err(e) => e,
    }
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    booking.confirm(&actor)?;

    let updated = match state.booking_repo.update_if_status(&booking, expected).await? {
        Some(b) => b,
        None => return Err(stale_transition_error(&state, &booking_id, "confirm").await),
    };

    info!("confirm_booking: booking '{}' confirmed by instructor '{}'", updated.id, actor.id);
    state.notifier.notify(EventKind::SchedulingConfirmed, &updated, state.clock.now()).await;

    Ok(Json(updated))
}

pub async fn start_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    let now = state.clock.now();
    booking.start(&actor, now)?;

    // Starting does not change the status, so the write must also insist the
    // stored row is still unstarted or concurrent starts would all land.
    let updated = match state.booking_repo.update_if_status_and_unstarted(&booking, expected).await? {
        Some(b) => b,
        None => return Err(stale_transition_error(&state, &booking_id, "start").await),
    };

    info!("start_booking: lesson '{}' started by '{}'", updated.id, actor.id);
    state.notifier.notify(EventKind::SchedulingStarted, &updated, now).await;

    Ok(Json(updated))
}

pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    let now = state.clock.now();
    booking.complete(&actor, now)?;

    let updated = match state.booking_repo.update_if_status(&booking, expected).await? {
        Some(b) => b,
        None => return Err(stale_transition_error(&state, &booking_id, "complete").await),
    };

    info!("complete_booking: lesson '{}' completed by '{}'", updated.id, actor.id);
    state.notifier.notify(EventKind::SchedulingCompleted, &updated, now).await;

    Ok(Json(updated))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
    payload: Option<Json<CancelBookingRequest>>,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    let now = state.clock.now();
    let reason = payload.and_then(|Json(p)| p.reason);
    booking.cancel(&actor, reason, now)?;

    let updated = match state.booking_repo.update_if_status(&booking, expected).await? {
        Some(b) => b,
        None => return Err(stale_transition_error(&state, &booking_id, "cancel").await),
    };

    info!(
        "cancel_booking: booking '{}' cancelled by '{}', refund fraction {:?}",
        updated.id, actor.id, updated.refund_fraction
    );

    if let Some(fraction) = updated.refund_fraction
        && let Err(e) = state.payment_gateway.notify_cancelled(&updated.id, fraction).await
    {
        warn!("cancel_booking: payment notification failed (ignored): {}", e);
    }
    state.notifier.notify(EventKind::SchedulingCancelled, &updated, now).await;

    Ok(Json(updated))
}

pub async fn request_reschedule(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    let new_start = payload.new_scheduled_at;
    booking.request_reschedule(&actor, new_start)?;

    // The proposed time must land on an open slot, ignoring the booking
    // itself since accepting would vacate its current interval.
    let now = state.clock.now();
    let date = new_start.date_naive();
    let weekday = date.weekday().num_days_from_monday() as i32;
    let windows = state
        .availability_repo
        .list_for_day(&booking.instructor_id, weekday)
        .await?;

    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);
    let mut blocking = state
        .booking_repo
        .list_blocking_in_range(&booking.instructor_id, day_start, day_end)
        .await?;
    blocking.retain(|b| b.id != booking.id);

    let slots = generate_slots(&windows, date, booking.duration_min, &blocking, now);
    if !slots.iter().any(|s| s.start_time == new_start && s.is_available) {
        return Err(AppError::SlotUnavailable("proposed time is not an open slot".into()));
    }

    // The write re-checks the proposed interval itself, so a booking that
    // lands between the slot read above and this statement still gets a
    // refusal instead of an open request on a taken hour.
    let proposed_end = new_start + Duration::minutes(booking.duration_min as i64);
    let updated = match state
        .booking_repo
        .update_if_status_and_free(&booking, expected, new_start, proposed_end)
        .await?
    {
        Some(b) => b,
        None => {
            let current = state
                .booking_repo
                .find_by_id(&booking_id)
                .await?
                .ok_or(AppError::NotFound("Booking not found".into()))?;
            if current.status == expected {
                return Err(AppError::SlotUnavailable("proposed time is not an open slot".into()));
            }
            return Err(AppError::InvalidTransition { current: current.status, attempted: "reschedule" });
        }
    };

    info!(
        "request_reschedule: booking '{}' move to {} requested by '{}'",
        updated.id, new_start, actor.id
    );
    state.notifier.notify(EventKind::RescheduleRequested, &updated, now).await;

    Ok(Json(updated))
}

pub async fn respond_reschedule(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<RescheduleResponseRequest>,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    let accepted = payload.accept;
    booking.respond_reschedule(&actor, accepted)?;

    let updated = if accepted {
        // Accepting moves the booking to the proposed interval, which must
        // still be free of other blocking bookings at commit time.
        match state
            .booking_repo
            .update_if_status_and_free(&booking, expected, booking.scheduled_at, booking.end_at)
            .await?
        {
            Some(b) => b,
            None => {
                let current = state
                    .booking_repo
                    .find_by_id(&booking_id)
                    .await?
                    .ok_or(AppError::NotFound("Booking not found".into()))?;
                if current.status == BookingStatus::RescheduleRequested {
                    return Err(AppError::SlotUnavailable(
                        "proposed time has been taken in the meantime".into(),
                    ));
                }
                return Err(AppError::InvalidTransition {
                    current: current.status,
                    attempted: "resolve a reschedule for",
                });
            }
        }
    } else {
        match state.booking_repo.update_if_status(&booking, expected).await? {
            Some(b) => b,
            None => {
                return Err(stale_transition_error(&state, &booking_id, "resolve a reschedule for").await)
            }
        }
    };

    info!(
        "respond_reschedule: booking '{}' {} by '{}'",
        updated.id,
        if accepted { "accepted" } else { "rejected" },
        actor.id
    );
    state.notifier.notify(EventKind::RescheduleResponded, &updated, state.clock.now()).await;

    Ok(Json(updated))
}

pub async fn cancel_reschedule(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    AuthActor(actor): AuthActor,
) -> Result<Json<Booking>, AppError> {
    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let expected = booking.status;
    booking.cancel_reschedule(&actor)?;

    let updated = match state.booking_repo.update_if_status(&booking, expected).await? {
        Some(b) => b,
        None => {
            return Err(stale_transition_error(&state, &booking_id, "withdraw a reschedule for").await)
        }
    };

    info!("cancel_reschedule: booking '{}' request withdrawn by '{}'", updated.id, actor.id);
    state.notifier.notify(EventKind::RescheduleResponded, &updated, state.clock.now()).await;

    Ok(Json(updated))
}
