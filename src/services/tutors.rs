use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{AppError, ScheduleError};
use crate::models::tutor::TutorFilters;
use crate::models::{AvailabilitySlot, Booking, Review, TutorProfile, User};
use crate::services::availability;

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    pub subject: Option<String>,
}

/// Resolves the acting user's tutor profile; most tutor operations start here.
pub fn require_profile(conn: &Connection, user_id: &str) -> Result<TutorProfile, AppError> {
    queries::profile_for_user(conn, user_id)?
        .ok_or_else(|| ScheduleError::TutorProfileNotFound.into())
}

pub fn create_profile(
    conn: &Connection,
    user_id: &str,
    input: ProfileInput,
) -> Result<TutorProfile, AppError> {
    if queries::profile_for_user(conn, user_id)?.is_some() {
        return Err(AppError::Validation(
            "tutor profile already exists".to_string(),
        ));
    }
    let Some(hourly_rate) = input.hourly_rate else {
        return Err(AppError::Validation("hourly_rate is required".to_string()));
    };
    if hourly_rate < 0.0 {
        return Err(AppError::Validation(
            "hourly_rate must not be negative".to_string(),
        ));
    }

    let profile = TutorProfile {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        bio: input.bio,
        hourly_rate,
        subject: input.subject,
        rating: 0.0,
        created_at: Utc::now().naive_utc(),
    };
    queries::create_profile(conn, &profile)?;
    Ok(profile)
}

/// Applies only the provided fields to the caller's existing profile.
pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    input: ProfileInput,
) -> Result<TutorProfile, AppError> {
    let mut profile = require_profile(conn, user_id)?;

    if let Some(bio) = input.bio {
        profile.bio = Some(bio);
    }
    if let Some(hourly_rate) = input.hourly_rate {
        if hourly_rate < 0.0 {
            return Err(AppError::Validation(
                "hourly_rate must not be negative".to_string(),
            ));
        }
        profile.hourly_rate = hourly_rate;
    }
    if let Some(subject) = input.subject {
        profile.subject = Some(subject);
    }

    queries::update_profile(conn, &profile)?;
    Ok(profile)
}

pub fn list_tutors(
    conn: &Connection,
    filters: &TutorFilters,
) -> Result<Vec<(TutorProfile, User)>, AppError> {
    Ok(queries::list_profiles(conn, filters)?)
}

pub struct TutorDetail {
    pub profile: TutorProfile,
    pub user: User,
    pub slots: Vec<AvailabilitySlot>,
    pub reviews: Vec<Review>,
}

pub fn tutor_detail(conn: &Connection, tutor_id: &str) -> Result<Option<TutorDetail>, AppError> {
    let Some(profile) = queries::profile_by_id(conn, tutor_id)? else {
        return Ok(None);
    };
    let Some(user) = queries::get_user(conn, &profile.user_id)? else {
        return Ok(None);
    };
    let slots = availability::list_for_tutor(conn, tutor_id)?;
    let reviews = queries::reviews_for_tutor(conn, tutor_id)?;
    Ok(Some(TutorDetail {
        profile,
        user,
        slots,
        reviews,
    }))
}

pub struct Dashboard {
    pub profile: TutorProfile,
    pub bookings: Vec<Booking>,
    pub slots: Vec<AvailabilitySlot>,
    pub reviews: Vec<Review>,
}

pub fn dashboard(conn: &Connection, user_id: &str) -> Result<Dashboard, AppError> {
    let profile = require_profile(conn, user_id)?;
    let bookings = queries::bookings_for_tutor(conn, &profile.id)?;
    let slots = availability::list_for_tutor(conn, &profile.id)?;
    let reviews = queries::reviews_for_tutor(conn, &profile.id)?;
    Ok(Dashboard {
        profile,
        bookings,
        slots,
        reviews,
    })
}
