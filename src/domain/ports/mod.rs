use crate::domain::models::{
    availability::AvailabilityWindow,
    booking::{Booking, BookingStatus, PaymentStatus},
    event::BookingEvent,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Insert guarded against overlapping windows for the same instructor and
    /// day; fails with `AvailabilityOverlap` instead of storing a collision.
    async fn create(&self, window: &AvailabilityWindow) -> Result<AvailabilityWindow, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<AvailabilityWindow>, AppError>;
    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<AvailabilityWindow>, AppError>;
    async fn list_for_day(&self, instructor_id: &str, day_of_week: i32) -> Result<Vec<AvailabilityWindow>, AppError>;
    /// Returns whether a row was actually removed; deleting an absent window
    /// is not an error.
    async fn delete(&self, instructor_id: &str, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomic create: the insert itself re-checks that no blocking booking
    /// overlaps the requested interval and fails with `SlotUnavailable`
    /// otherwise. Never check-then-act in two statements.
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_student(&self, student_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_by_instructor(&self, instructor_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Blocking-status bookings touching `[start, end)` for one instructor.
    async fn list_blocking_in_range(
        &self,
        instructor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError>;
    /// Optimistic write: persists the booking's mutable fields only while the
    /// stored status still equals `expected`. `None` means a concurrent
    /// transition won; the caller re-reads and reports the actual state.
    async fn update_if_status(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<Option<Booking>, AppError>;
    /// Same optimistic write, additionally requiring that the stored row has
    /// no `started_at` yet. Starting leaves the status in place, so the
    /// status check alone would let replayed starts through; `None` means
    /// another start (or another transition) already landed.
    async fn update_if_status_and_unstarted(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<Option<Booking>, AppError>;
    /// Same optimistic write, additionally guarded against `[free_start,
    /// free_end)` colliding with another blocking booking of the instructor.
    /// Accepting a reschedule passes the interval the booking is moving to;
    /// opening a request passes the proposed interval, so in both cases the
    /// availability re-check commits in the same statement as the status
    /// change.
    async fn update_if_status_and_free(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        free_start: DateTime<Utc>,
        free_end: DateTime<Utc>,
    ) -> Result<Option<Booking>, AppError>;
    async fn set_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Option<Booking>, AppError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn notify_created(&self, booking: &Booking) -> Result<(), AppError>;
    async fn notify_cancelled(&self, booking_id: &str, refund_fraction: f64) -> Result<(), AppError>;
}

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Session ids currently connected for the given actor. Empty when the
    /// actor has no live push connection (callers fall back to polling).
    async fn sessions_for(&self, actor_id: &str) -> Vec<String>;
    /// At-most-once delivery; an unreachable or full session is an error the
    /// caller may log and must otherwise ignore.
    async fn publish(&self, session_id: &str, event: &BookingEvent) -> Result<(), AppError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
