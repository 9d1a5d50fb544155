use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: NaiveDateTime,
}
