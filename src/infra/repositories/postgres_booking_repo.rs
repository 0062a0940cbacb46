use crate::domain::models::booking::{Booking, BookingStatus, PaymentStatus};
use crate::domain::ports::BookingRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::rows::{rows_into_bookings, BookingRow};

const BLOCKING: &str = "('PENDING', 'CONFIRMED', 'RESCHEDULE_REQUESTED')";

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// The bookings table carries an exclusion constraint over
// (instructor_id, tstzrange(scheduled_at, end_at)) restricted to blocking
// statuses, so when the NOT EXISTS guard races under concurrent writers the
// constraint still decides. SQLSTATE 23P01 (exclusion violation) therefore
// always means "slot taken".
fn map_exclusion(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e
        && db.code().as_deref() == Some("23P01") {
        return AppError::SlotUnavailable("another booking holds this time".to_string());
    }
    AppError::Database(e)
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        let sql = format!(
            "INSERT INTO bookings (id, student_id, instructor_id, scheduled_at, end_at, duration_min, status, price, payment_status, rescheduled_at, rescheduled_by, rescheduled_from, started_at, completed_at, cancelled_reason, refund_fraction, created_at)
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
             WHERE NOT EXISTS (
                 SELECT 1 FROM bookings
                 WHERE instructor_id = $3 AND status IN {BLOCKING} AND scheduled_at < $5 AND end_at > $4
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
            .fetch_optional(&self.pool).await.map_err(map_exclusion)?;

        match row {
            Some(r) => r.into_booking(),
            None => Err(AppError::SlotUnavailable("another booking holds this time".to_string())),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn list_by_student(&self, student_id: &str) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE student_id = $1 ORDER BY scheduled_at ASC")
            .bind(student_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<Booking>, AppError> {
        let rows = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE instructor_id = $1 ORDER BY scheduled_at ASC")
            .bind(instructor_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn list_blocking_in_range(&self, instructor_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        let sql = format!(
            "SELECT * FROM bookings WHERE instructor_id = $1 AND scheduled_at < $2 AND end_at > $3 AND status IN {BLOCKING}"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(instructor_id).bind(end).bind(start)
            .fetch_all(&self.pool).await.map_err(AppError::Database)?;
        rows_into_bookings(rows)
    }

    async fn update_if_status(&self, booking: &Booking, expected: BookingStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET scheduled_at=$1, end_at=$2, status=$3, rescheduled_at=$4, rescheduled_by=$5, rescheduled_from=$6, started_at=$7, completed_at=$8, cancelled_reason=$9, refund_fraction=$10
             WHERE id=$11 AND status=$12
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
            "UPDATE bookings SET scheduled_at=$1, end_at=$2, status=$3, rescheduled_at=$4, rescheduled_by=$5, rescheduled_from=$6, started_at=$7, completed_at=$8, cancelled_reason=$9, refund_fraction=$10
             WHERE id=$11 AND status=$12 AND started_at IS NULL
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
            "UPDATE bookings SET scheduled_at=$1, end_at=$2, status=$3, rescheduled_at=$4, rescheduled_by=$5, rescheduled_from=$6, started_at=$7, completed_at=$8, cancelled_reason=$9, refund_fraction=$10
             WHERE id=$11 AND status=$12
               AND NOT EXISTS (
                   SELECT 1 FROM bookings b2
                   WHERE b2.instructor_id = $13 AND b2.id <> bookings.id AND b2.status IN {BLOCKING} AND b2.scheduled_at < $14 AND b2.end_at > $15
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
            .fetch_optional(&self.pool).await.map_err(map_exclusion)?
            .map(BookingRow::into_booking).transpose()
    }

    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRow>("UPDATE bookings SET payment_status = $1 WHERE id = $2 RETURNING *")
            .bind(status.as_str()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(BookingRow::into_booking).transpose()
    }
}
