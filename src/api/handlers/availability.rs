use axum::{extract::{Path, Query, State}, Json};
use chrono::{Datelike, Duration, NaiveTime};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateAvailabilityRequest, SlotsQuery};
use crate::api::dtos::responses::{AvailabilityWindowResponse, RemovedResponse, SlotsResponse};
use crate::api::extractors::actor::AuthActor;
use crate::domain::models::actor::{Actor, ActorRole};
use crate::domain::models::availability::{format_hhmm, parse_hhmm, AvailabilityWindow};
use crate::domain::services::slots::generate_slots;
use crate::error::AppError;
use crate::state::AppState;

fn ensure_owner(actor: &Actor, instructor_id: &str) -> Result<(), AppError> {
    if actor.role != ActorRole::Instructor || actor.id != instructor_id {
        return Err(AppError::Forbidden(
            "only the owning instructor can manage availability".into(),
        ));
    }
    Ok(())
}

fn to_response(w: &AvailabilityWindow) -> AvailabilityWindowResponse {
    AvailabilityWindowResponse {
        id: w.id.clone(),
        instructor_id: w.instructor_id.clone(),
        day_of_week: w.day_of_week,
        start: format_hhmm(w.start_min),
        end: format_hhmm(w.end_min),
    }
}

pub async fn add_window(
    State(state): State<Arc<AppState>>,
    Path(instructor_id): Path<String>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<CreateAvailabilityRequest>,
) -> Result<Json<AvailabilityWindowResponse>, AppError> {
    ensure_owner(&actor, &instructor_id)?;

    if !(0..=6).contains(&payload.day_of_week) {
        return Err(AppError::Validation(
            "day_of_week must be between 0 (Monday) and 6 (Sunday)".into(),
        ));
    }
    let start_min = parse_hhmm(&payload.start)?;
    let end_min = parse_hhmm(&payload.end)?;
    if start_min >= end_min {
        return Err(AppError::InvalidRange(format!(
            "start {} must be before end {}",
            payload.start, payload.end
        )));
    }

    info!(
        "add_window: instructor '{}' adding day {} {}-{}",
        instructor_id, payload.day_of_week, payload.start, payload.end
    );

    let window = AvailabilityWindow::new(instructor_id, payload.day_of_week, start_min, end_min);
    let created = state.availability_repo.create(&window).await?;

    Ok(Json(to_response(&created)))
}

pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    Path(instructor_id): Path<String>,
) -> Result<Json<Vec<AvailabilityWindowResponse>>, AppError> {
    let windows = state.availability_repo.list_by_instructor(&instructor_id).await?;
    Ok(Json(windows.iter().map(to_response).collect()))
}

pub async fn remove_window(
    State(state): State<Arc<AppState>>,
    Path((instructor_id, window_id)): Path<(String, String)>,
    AuthActor(actor): AuthActor,
) -> Result<Json<RemovedResponse>, AppError> {
    ensure_owner(&actor, &instructor_id)?;

    let removed = state.availability_repo.delete(&instructor_id, &window_id).await?;
    info!(
        "remove_window: instructor '{}' removed window '{}': {}",
        instructor_id, window_id, removed
    );

    Ok(Json(RemovedResponse { removed }))
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(instructor_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    if query.duration_min <= 0 || query.duration_min > 1440 {
        return Err(AppError::Validation("duration_min must be between 1 and 1440".into()));
    }

    let weekday = query.date.weekday().num_days_from_monday() as i32;
    let windows = state.availability_repo.list_for_day(&instructor_id, weekday).await?;

    let day_start = query.date.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);
    let blocking = state
        .booking_repo
        .list_blocking_in_range(&instructor_id, day_start, day_end)
        .await?;

    let now = state.clock.now();
    let slots = generate_slots(&windows, query.date, query.duration_min, &blocking, now);

    Ok(Json(SlotsResponse {
        date: query.date.to_string(),
        duration_min: query.duration_min,
        slots,
    }))
}
