use crate::domain::models::booking::{Booking, BookingStatus, PaymentStatus};
use crate::domain::ports::BookingRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::rows::{rows_into_bookings, BookingRow};

const BLOCKING: &str = "('PENDING', 'CONFIRMED', 'RESCHEDULE_REQUESTED')";

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        // Single-statement insert: the overlap re-check and the write are one
        // atomic unit under SQLite's writer lock.
        let sql = format!(
            "INSERT INTO bookings (id, student_id, instructor_id, scheduled_at, end_at, duration_min, status, price, payment_status, rescheduled_at, rescheduled_by, rescheduled_from, started_at, completed_at, cancelled_reason, refund_fraction, created_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM bookings
                 WHERE instructor_id = ? AND status IN {BLOCKING} AND scheduled_at < ? AND end_at > ?
             )
             RETURNING *"
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(&booking.id).bind(&booking.student_id).bind(&booking.instructor_id)
            .bind(booking.scheduled_at).bind(booking.end_at).bind(booking.duration_min)
            .bind(booking.status.as_str()).bind(booking.price).bind(booking.payment_status.as_str())
            .bind(booking.rescheduled_at).bind(&booking.rescheduled_by)
            .bind(booking.rescheduled_from.map(|s| s.as_str()))
            .bind(booking.started_at).bind(booking.completed_at)
            .bind(&booking.cancelled_reason).bind(booking.refund_fraction).bind(booking.created_at)
            .bind(&booking.instructor_id).bind(booking.end_at).bind(booking.scheduled_at)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?;

        match row {
            Some(r) => r.into_booking(),
            None => Err(AppError::SlotUnavailable("another booking holds this time".to_string())),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn list_by_student(&self, student_id: &str) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE student_id = ? ORDER BY scheduled_at ASC")
            .bind(student_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE instructor_id = ? ORDER BY scheduled_at ASC")
            .bind(instructor_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn list_blocking_in_range(&self, instructor_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        let sql = format!(
            "SELECT * FROM bookings WHERE instructor_id = ? AND scheduled_at < ? AND end_at > ? AND status IN {BLOCKING}"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(instructor_id).bind(end).bind(start)
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn update_if_status(&self, booking: &Booking, expected: BookingStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET scheduled_at=?, end_at=?, status=?, rescheduled_at=?, rescheduled_by=?, rescheduled_from=?, started_at=?, completed_at=?, cancelled_reason=?, refund_fraction=?
             WHERE id=? AND status=?
             RETURNING *"
        )
            .bind(booking.scheduled_at).bind(booking.end_at).bind(booking.status.as_str())
            .bind(booking.rescheduled_at).bind(&booking.rescheduled_by)
            .bind(booking.rescheduled_from.map(|s| s.as_str()))
            .bind(booking.started_at).bind(booking.completed_at)
            .bind(&booking.cancelled_reason).bind(booking.refund_fraction)
            .bind(&booking.id).bind(expected.as_str())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn update_if_status_and_unstarted(&self, booking: &Booking, expected: BookingStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET scheduled_at=?, end_at=?, status=?, rescheduled_at=?, rescheduled_by=?, rescheduled_from=?, started_at=?, completed_at=?, cancelled_reason=?, refund_fraction=?
             WHERE id=? AND status=? AND started_at IS NULL
             RETURNING *"
        )
            .bind(booking.scheduled_at).bind(booking.end_at).bind(booking.status.as_str())
            .bind(booking.rescheduled_at).bind(&booking.rescheduled_by)
            .bind(booking.rescheduled_from.map(|s| s.as_str()))
            .bind(booking.started_at).bind(booking.completed_at)
            .bind(&booking.cancelled_reason).bind(booking.refund_fraction)
            .bind(&booking.id).bind(expected.as_str())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn update_if_status_and_free(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        free_start: DateTime<Utc>,
        free_end: DateTime<Utc>,
    ) -> Result<Option<Booking>, AppError> {
        let sql = format!(
            "UPDATE bookings SET scheduled_at=?, end_at=?, status=?, rescheduled_at=?, rescheduled_by=?, rescheduled_from=?, started_at=?, completed_at=?, cancelled_reason=?, refund_fraction=?
             WHERE id=? AND status=?
               AND NOT EXISTS (
                   SELECT 1 FROM bookings b2
                   WHERE b2.instructor_id = ? AND b2.id != bookings.id AND b2.status IN {BLOCKING} AND b2.scheduled_at < ? AND b2.end_at > ?
               )
             RETURNING *"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.scheduled_at).bind(booking.end_at).bind(booking.status.as_str())
            .bind(booking.rescheduled_at).bind(&booking.rescheduled_by)
            .bind(booking.rescheduled_from.map(|s| s.as_str()))
            .bind(booking.started_at).bind(booking.completed_at)
            .bind(&booking.cancelled_reason).bind(booking.refund_fraction)
            .bind(&booking.id).bind(expected.as_str())
            .bind(&booking.instructor_id).bind(free_end).bind(free_start)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>("UPDATE bookings SET payment_status = ? WHERE id = ? RETURNING *")
            .bind(status.as_str()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }
}
