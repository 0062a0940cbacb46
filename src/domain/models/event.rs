use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::booking::{Booking, BookingStatus};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SchedulingCreated,
    SchedulingConfirmed,
    SchedulingCancelled,
    SchedulingStarted,
    SchedulingCompleted,
    RescheduleRequested,
    RescheduleResponded,
}

/// One message per committed transition, pushed to both parties' sessions.
/// Consumers treat it as a re-fetch hint; the booking record stays the source
/// of truth.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: BookingEventData,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingEventData {
    pub booking_id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub status: BookingStatus,
    pub occurred_at: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(kind: EventKind, booking: &Booking, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            data: BookingEventData {
                booking_id: booking.id.clone(),
                student_id: booking.student_id.clone(),
                instructor_id: booking.instructor_id.clone(),
                status: booking.status,
                occurred_at,
            },
        }
    }
}
