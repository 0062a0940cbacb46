use serde::Serialize;

use crate::domain::models::slot::TimeSlot;

#[derive(Serialize)]
pub struct AvailabilityWindowResponse {
    pub id: String,
    pub instructor_id: String,
    pub day_of_week: i32,
    pub start: String,
    pub end: String,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub duration_min: i32,
    pub slots: Vec<TimeSlot>,
}
