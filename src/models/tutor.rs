use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A tutor's marketplace profile. Exactly one per tutor user; owns the
/// availability slots and the tutor side of bookings.
#[derive(Debug, Clone, Serialize)]
pub struct TutorProfile {
    pub id: String,
    pub user_id: String,
    pub bio: Option<String>,
    pub hourly_rate: f64,
    pub subject: Option<String>,
    pub rating: f64,
    #[serde(skip_serializing)]
    pub created_at: NaiveDateTime,
}

/// Browse filters. Every recognized filter is a named field; anything else
/// in the query string is ignored by construction rather than applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TutorFilters {
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub subject: Option<String>,
}
