use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::booking::Booking;
use crate::domain::models::event::{BookingEvent, EventKind};
use crate::domain::ports::PushChannel;

/// Fans one event per committed transition out to every live session of both
/// parties. Runs strictly after the transition committed; delivery failures
/// are logged and swallowed, never surfaced to the transition caller.
pub struct BookingNotifier {
    channel: Arc<dyn PushChannel>,
}

impl BookingNotifier {
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self { channel }
    }

    pub async fn notify(&self, kind: EventKind, booking: &Booking, occurred_at: DateTime<Utc>) {
        let event = BookingEvent::new(kind, booking, occurred_at);

        let mut sessions = self.channel.sessions_for(&booking.student_id).await;
        sessions.extend(self.channel.sessions_for(&booking.instructor_id).await);

        if sessions.is_empty() {
            debug!(booking_id = %booking.id, kind = ?kind, "No connected sessions for booking parties, clients will pick the change up by polling");
            return;
        }

        for session_id in sessions {
            if let Err(e) = self.channel.publish(&session_id, &event).await {
                warn!(booking_id = %booking.id, session_id = %session_id, "Push delivery failed (ignored): {}", e);
            }
        }
    }
}
