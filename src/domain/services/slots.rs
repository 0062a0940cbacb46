use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::cmp::{max, min};

use crate::domain::models::availability::AvailabilityWindow;
use crate::domain::models::booking::Booking;
use crate::domain::models::slot::TimeSlot;

const TOTAL_MINUTES: usize = 1440;

/// Derives all candidate slots for one instructor, date and duration. Pure
/// function of its inputs: callers pass the committed bookings and the clock
/// value they observed, nothing is read from the environment.
pub fn generate_slots(
    windows: &[AvailabilityWindow],
    date: NaiveDate,
    duration_min: i32,
    blocking_bookings: &[Booking],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    if duration_min <= 0 {
        return Vec::new();
    }
    let duration = duration_min as usize;

    // Mon=0 .. Sun=6, same convention the windows are stored in.
    let weekday = date.weekday().num_days_from_monday() as i32;

    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);

    let mut booked = [false; TOTAL_MINUTES];
    for booking in blocking_bookings {
        let b_start = max(booking.scheduled_at, day_start);
        let b_end = min(booking.end_at, day_end);

        if b_start < b_end {
            let s_idx = max(0, min((b_start - day_start).num_minutes(), TOTAL_MINUTES as i64)) as usize;
            let e_idx = max(0, min((b_end - day_start).num_minutes(), TOTAL_MINUTES as i64)) as usize;

            for minute in &mut booked[s_idx..e_idx] {
                *minute = true;
            }
        }
    }

    let mut slots = Vec::new();
    for window in windows {
        if window.day_of_week != weekday {
            continue;
        }

        let win_start = max(window.start_min, 0) as usize;
        let win_end = min(window.end_min, TOTAL_MINUTES as i32) as usize;

        // No partial trailing slot: the last candidate must fit entirely.
        let mut cursor = win_start;
        while cursor + duration <= win_end {
            let start_time = day_start + Duration::minutes(cursor as i64);
            let end_time = start_time + Duration::minutes(duration as i64);

            let collides = booked[cursor..cursor + duration].iter().any(|m| *m);
            let is_available = !collides && start_time > now;

            slots.push(TimeSlot { start_time, end_time, is_available });
            cursor += duration;
        }
    }

    slots.sort_by_key(|s| s.start_time);
    slots.dedup();
    slots
}
