use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::models::actor::{Actor, ActorRole};
use crate::domain::services::policy::refund_fraction;
use crate::error::AppError;

/// How early a lesson may be started, in minutes before its scheduled time.
pub const START_GRACE_MIN: i64 = 15;

/// Closed set of booking states. Blocking states occupy the instructor's
/// calendar; terminal states are kept for history and never leave.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    RescheduleRequested,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::RescheduleRequested => "RESCHEDULE_REQUESTED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "RESCHEDULE_REQUESTED" => Ok(BookingStatus::RescheduleRequested),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::InternalWithMsg(format!("unknown booking status '{}'", other))),
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::RescheduleRequested
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment outcome as reported by the payment collaborator. Recorded, never
/// acted on by the engine itself.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    pub id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_min: i32,
    pub status: BookingStatus,
    pub price: i64,
    pub payment_status: PaymentStatus,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_by: Option<String>,
    pub rescheduled_from: Option<BookingStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
    pub refund_fraction: Option<f64>,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub student_id: String,
    pub instructor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_min: i32,
    pub price: i64,
    pub confirmed: bool,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        let end_at = params.scheduled_at + Duration::minutes(params.duration_min as i64);

        Self {
            id: Uuid::new_v4().to_string(),
            student_id: params.student_id,
            instructor_id: params.instructor_id,
            scheduled_at: params.scheduled_at,
            end_at,
            duration_min: params.duration_min,
            status: if params.confirmed { BookingStatus::Confirmed } else { BookingStatus::Pending },
            price: params.price,
            payment_status: PaymentStatus::Pending,
            rescheduled_at: None,
            rescheduled_by: None,
            rescheduled_from: None,
            started_at: None,
            completed_at: None,
            cancelled_reason: None,
            refund_fraction: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_party(&self, actor: &Actor) -> bool {
        match actor.role {
            ActorRole::Student => actor.id == self.student_id,
            ActorRole::Instructor => actor.id == self.instructor_id,
        }
    }

    fn ensure_party(&self, actor: &Actor) -> Result<(), AppError> {
        if self.is_party(actor) {
            Ok(())
        } else {
            Err(AppError::Forbidden("actor is not a party to this booking".to_string()))
        }
    }

    // Every status mutation in the system goes through one of the transition
    // methods below. They check party membership, then role, then status, and
    // only then touch state.

    pub fn confirm(&mut self, actor: &Actor) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if actor.role != ActorRole::Instructor {
            return Err(AppError::Forbidden("only the instructor can confirm a booking".to_string()));
        }
        if self.status != BookingStatus::Pending {
            return Err(AppError::InvalidTransition { current: self.status, attempted: "confirm" });
        }
        self.status = BookingStatus::Confirmed;
        Ok(())
    }

    pub fn start(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if self.status != BookingStatus::Confirmed || self.started_at.is_some() {
            return Err(AppError::InvalidTransition { current: self.status, attempted: "start" });
        }
        let earliest = self.scheduled_at - Duration::minutes(START_GRACE_MIN);
        if now < earliest {
            return Err(AppError::Validation(format!(
                "lesson cannot start before {}",
                earliest.format("%Y-%m-%d %H:%M UTC")
            )));
        }
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if self.status != BookingStatus::Confirmed || self.started_at.is_none() {
            return Err(AppError::InvalidTransition { current: self.status, attempted: "complete" });
        }
        self.status = BookingStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Cancel from any blocking state. The refund fraction is fixed at this
    /// instant, against the booking's current scheduled time.
    pub fn cancel(&mut self, actor: &Actor, reason: Option<String>, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if !self.status.is_blocking() {
            return Err(AppError::InvalidTransition { current: self.status, attempted: "cancel" });
        }
        let hours_until = (self.scheduled_at - now).num_minutes() as f64 / 60.0;
        self.refund_fraction = Some(refund_fraction(hours_until));
        self.status = BookingStatus::Cancelled;
        self.cancelled_reason = reason;
        self.rescheduled_at = None;
        self.rescheduled_by = None;
        self.rescheduled_from = None;
        Ok(())
    }

    pub fn request_reschedule(&mut self, actor: &Actor, new_start: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if !matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(AppError::InvalidTransition { current: self.status, attempted: "reschedule" });
        }
        self.rescheduled_from = Some(self.status);
        self.rescheduled_at = Some(new_start);
        self.rescheduled_by = Some(actor.id.clone());
        self.status = BookingStatus::RescheduleRequested;
        Ok(())
    }

    /// Accept or reject a pending reschedule request. Only the party that did
    /// not open the request may respond; either outcome returns the booking to
    /// its remembered pre-request status.
    pub fn respond_reschedule(&mut self, actor: &Actor, accept: bool) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if self.status != BookingStatus::RescheduleRequested {
            return Err(AppError::InvalidTransition {
                current: self.status,
                attempted: "resolve a reschedule for",
            });
        }
        if self.rescheduled_by.as_deref() == Some(actor.id.as_str()) {
            return Err(AppError::Forbidden(
                "the requesting party cannot respond to its own reschedule request".to_string(),
            ));
        }
        let origin = self.rescheduled_from.ok_or(AppError::Internal)?;
        if accept {
            let new_start = self.rescheduled_at.ok_or(AppError::Internal)?;
            self.scheduled_at = new_start;
            self.end_at = new_start + Duration::minutes(self.duration_min as i64);
        }
        self.status = origin;
        self.rescheduled_at = None;
        self.rescheduled_by = None;
        self.rescheduled_from = None;
        Ok(())
    }

    pub fn cancel_reschedule(&mut self, actor: &Actor) -> Result<(), AppError> {
        self.ensure_party(actor)?;
        if self.status != BookingStatus::RescheduleRequested {
            return Err(AppError::InvalidTransition {
                current: self.status,
                attempted: "withdraw a reschedule for",
            });
        }
        if self.rescheduled_by.as_deref() != Some(actor.id.as_str()) {
            return Err(AppError::Forbidden(
                "only the requesting party can withdraw a reschedule request".to_string(),
            ));
        }
        let origin = self.rescheduled_from.ok_or(AppError::Internal)?;
        self.status = origin;
        self.rescheduled_at = None;
        self.rescheduled_by = None;
        self.rescheduled_from = None;
        Ok(())
    }
}
