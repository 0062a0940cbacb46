use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: i32,
    pub start: String,
    pub end: String,
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub duration_min: i32,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub instructor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_min: i32,
    #[serde(default)]
    pub price: i64,
}

#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_scheduled_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct RescheduleResponseRequest {
    pub accept: bool,
}

#[derive(Deserialize)]
pub struct PaymentCallbackRequest {
    pub status: String,
}
