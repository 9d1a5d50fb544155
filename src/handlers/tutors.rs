use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::tutor::TutorFilters;
use crate::models::{PublicUser, Review, Role, SlotView, TutorProfile, User};
use crate::services::tutors::{self, ProfileInput};
use crate::state::AppState;

#[derive(Serialize)]
pub struct TutorResponse {
    pub id: String,
    pub bio: Option<String>,
    pub hourly_rate: f64,
    pub subject: Option<String>,
    pub rating: f64,
    pub user: PublicUser,
}

impl TutorResponse {
    pub(crate) fn from_parts(profile: &TutorProfile, user: &User) -> TutorResponse {
        TutorResponse {
            id: profile.id.clone(),
            bio: profile.bio.clone(),
            hourly_rate: profile.hourly_rate,
            subject: profile.subject.clone(),
            rating: profile.rating,
            user: PublicUser::from(user),
        }
    }
}

// GET /api/tutors
pub async fn list_tutors(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<TutorFilters>,
) -> Result<Json<Vec<TutorResponse>>, AppError> {
    let tutors = {
        let db = state.db.lock().unwrap();
        tutors::list_tutors(&db, &filters)?
    };

    let response = tutors
        .iter()
        .map(|(profile, user)| TutorResponse::from_parts(profile, user))
        .collect();
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct TutorDetailResponse {
    #[serde(flatten)]
    pub tutor: TutorResponse,
    pub availability: Vec<SlotView>,
    pub reviews: Vec<Review>,
}

// GET /api/tutors/:id
pub async fn tutor_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TutorDetailResponse>, AppError> {
    let detail = {
        let db = state.db.lock().unwrap();
        tutors::tutor_detail(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("tutor {id}")))?;

    Ok(Json(TutorDetailResponse {
        tutor: TutorResponse::from_parts(&detail.profile, &detail.user),
        availability: detail.slots.iter().map(SlotView::from).collect(),
        reviews: detail.reviews,
    }))
}

// POST /api/tutors/profile
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<(StatusCode, Json<TutorProfile>), AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let profile = {
        let db = state.db.lock().unwrap();
        tutors::create_profile(&db, &user.id, input)?
    };
    Ok((StatusCode::CREATED, Json(profile)))
}

// PATCH /api/tutors/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<Json<TutorProfile>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let profile = {
        let db = state.db.lock().unwrap();
        tutors::update_profile(&db, &user.id, input)?
    };
    Ok(Json(profile))
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub profile: TutorProfile,
    pub bookings: Vec<super::bookings::BookingResponse>,
    pub availability: Vec<SlotView>,
    pub reviews: Vec<Review>,
}

// GET /api/tutors/dashboard/me
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let dashboard = {
        let db = state.db.lock().unwrap();
        tutors::dashboard(&db, &user.id)?
    };

    Ok(Json(DashboardResponse {
        profile: dashboard.profile,
        bookings: dashboard
            .bookings
            .iter()
            .map(super::bookings::BookingResponse::from)
            .collect(),
        availability: dashboard.slots.iter().map(SlotView::from).collect(),
        reviews: dashboard.reviews,
    }))
}
