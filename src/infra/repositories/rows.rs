use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::models::booking::{Booking, BookingStatus, PaymentStatus};
use crate::error::AppError;

// Status columns are stored as TEXT; the closed enums live only in the domain.
// This row type is the single place the conversion happens for both backends.
#[derive(FromRow)]
pub(super) struct BookingRow {
    pub id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_min: i32,
    pub status: String,
    pub price: i64,
    pub payment_status: String,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_by: Option<String>,
    pub rescheduled_from: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
    pub refund_fraction: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BookingRow {
    pub(super) fn into_booking(self) -> Result<Booking, AppError> {
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            AppError::InternalWithMsg(format!("unknown payment status '{}' in storage", self.payment_status))
        })?;

        Ok(Booking {
            id: self.id,
            student_id: self.student_id,
            instructor_id: self.instructor_id,
            scheduled_at: self.scheduled_at,
            end_at: self.end_at,
            duration_min: self.duration_min,
            status: BookingStatus::parse(&self.status)?,
            price: self.price,
            payment_status,
            rescheduled_at: self.rescheduled_at,
            rescheduled_by: self.rescheduled_by,
            rescheduled_from: self.rescheduled_from.as_deref().map(BookingStatus::parse).transpose()?,
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_reason: self.cancelled_reason,
            refund_fraction: self.refund_fraction,
            created_at: self.created_at,
        })
    }
}

pub(super) fn rows_into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, AppError> {
    rows.into_iter().map(BookingRow::into_booking).collect()
}
