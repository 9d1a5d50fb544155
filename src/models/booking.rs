use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A booked session. Fixed one-hour duration starting at `session_date`
/// (stored as a UTC wall-clock instant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub session_date: NaiveDateTime,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// `Upcoming` is the only non-terminal state: students cancel, tutors
/// complete. Cancelled and completed bookings never transition again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Upcoming => "UPCOMING",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETED" => BookingStatus::Completed,
            "CANCELLED" => BookingStatus::Cancelled,
            _ => BookingStatus::Upcoming,
        }
    }
}
