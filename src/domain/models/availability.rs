use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

// Times-of-day are minutes since midnight; the API speaks "HH:MM".

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AvailabilityWindow {
    pub id: String,
    pub instructor_id: String,
    pub day_of_week: i32,
    pub start_min: i32,
    pub end_min: i32,
    pub created_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn new(instructor_id: String, day_of_week: i32, start_min: i32, end_min: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            instructor_id,
            day_of_week,
            start_min,
            end_min,
            created_at: Utc::now(),
        }
    }

    pub fn overlaps(&self, start_min: i32, end_min: i32) -> bool {
        start_min < self.end_min && self.start_min < end_min
    }
}

pub fn parse_hhmm(s: &str) -> Result<i32, AppError> {
    let invalid = || AppError::Validation(format!("invalid time '{}', expected HH:MM", s));
    let (h, m) = s.split_once(':').ok_or_else(invalid)?;
    let h: i32 = h.parse().map_err(|_| invalid())?;
    let m: i32 = m.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return Err(invalid());
    }
    Ok(h * 60 + m)
}

pub fn format_hhmm(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
