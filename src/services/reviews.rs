use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Review;

/// A student may review a tutor once, and only after completing a session
/// with them. The tutor's mean rating is recomputed in the same transaction.
pub fn create_review(
    conn: &Connection,
    student_id: &str,
    tutor_id: &str,
    rating: i64,
    comment: Option<String>,
) -> Result<Review, AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let tx = conn.unchecked_transaction()?;

    if queries::profile_by_id(&tx, tutor_id)?.is_none() {
        return Err(AppError::NotFound(format!("tutor {tutor_id}")));
    }
    if !queries::has_completed_booking(&tx, student_id, tutor_id)? {
        return Err(AppError::Validation(
            "you can only review a tutor after completing a session".to_string(),
        ));
    }
    if queries::review_exists(&tx, student_id, tutor_id)? {
        return Err(AppError::Validation(
            "you have already reviewed this tutor".to_string(),
        ));
    }

    let review = Review {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        tutor_id: tutor_id.to_string(),
        rating,
        comment,
        created_at: Utc::now().naive_utc(),
    };
    queries::create_review(&tx, &review)?;

    if let Some(avg) = queries::average_rating(&tx, tutor_id)? {
        queries::set_profile_rating(&tx, tutor_id, avg)?;
    }

    tx.commit()?;
    Ok(review)
}
