use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, Role, TutorProfile, User};
use crate::services::scheduling;
use crate::state::AppState;

use super::tutors::TutorResponse;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub tutor_id: String,
    pub session_date: String,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub session_date: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> BookingResponse {
        BookingResponse {
            id: booking.id.clone(),
            student_id: booking.student_id.clone(),
            tutor_id: booking.tutor_id.clone(),
            session_date: booking.session_date.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            status: booking.status.as_str().to_string(),
            created_at: booking.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            updated_at: booking.updated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct BookingWithTutorResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub tutor: TutorResponse,
}

fn with_tutor(booking: &Booking, profile: &TutorProfile, user: &User) -> BookingWithTutorResponse {
    BookingWithTutorResponse {
        booking: BookingResponse::from(booking),
        tutor: TutorResponse::from_parts(profile, user),
    }
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let user = super::authed_role(&state, &headers, Role::Student)?;

    let booking = {
        let db = state.db.lock().unwrap();
        scheduling::create_booking(&db, &user.id, &req.tutor_id, &req.session_date, Utc::now())?
    };

    tracing::info!(
        booking_id = %booking.id,
        tutor_id = %booking.tutor_id,
        "created booking"
    );
    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

// GET /api/bookings
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingWithTutorResponse>>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Student)?;

    let bookings = {
        let db = state.db.lock().unwrap();
        scheduling::my_bookings(&db, &user.id)?
    };

    let response = bookings
        .iter()
        .map(|(booking, profile, tutor_user)| with_tutor(booking, profile, tutor_user))
        .collect();
    Ok(Json(response))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingWithTutorResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Student)?;

    let found = {
        let db = state.db.lock().unwrap();
        scheduling::booking_for_student(&db, &id, &user.id)?
    };

    let (booking, profile, tutor_user) =
        found.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(with_tutor(&booking, &profile, &tutor_user)))
}

// PATCH /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Student)?;

    let cancelled = {
        let db = state.db.lock().unwrap();
        scheduling::cancel_booking(&db, &id, &user.id)?
    };

    let booking = cancelled.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    Ok(Json(BookingResponse::from(&booking)))
}

// PATCH /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let booking = {
        let db = state.db.lock().unwrap();
        scheduling::complete_booking(&db, &id, &user.id)?
    };
    Ok(Json(BookingResponse::from(&booking)))
}
