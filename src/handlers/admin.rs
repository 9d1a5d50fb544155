use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{PublicUser, Role, User};
use crate::services::admin;
use crate::state::AppState;

use super::bookings::BookingResponse;
use super::tutors::TutorResponse;

#[derive(Serialize)]
pub struct AdminUserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_banned: bool,
    pub banned_at: Option<String>,
    pub created_at: String,
}

impl From<&User> for AdminUserResponse {
    fn from(user: &User) -> AdminUserResponse {
        AdminUserResponse {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_banned: user.is_banned,
            banned_at: user
                .banned_at
                .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            created_at: user.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AdminBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub student: PublicUser,
    pub tutor: TutorResponse,
}

#[derive(Deserialize)]
pub struct UpdateUserStatusRequest {
    pub is_banned: bool,
}

// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminUserResponse>>, AppError> {
    super::authed_role(&state, &headers, Role::Admin)?;

    let users = {
        let db = state.db.lock().unwrap();
        admin::list_users(&db)?
    };
    Ok(Json(users.iter().map(AdminUserResponse::from).collect()))
}

// GET /api/admin/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminBookingResponse>>, AppError> {
    super::authed_role(&state, &headers, Role::Admin)?;

    let bookings = {
        let db = state.db.lock().unwrap();
        admin::list_bookings(&db)?
    };

    let response = bookings
        .iter()
        .map(|(booking, student, profile, tutor_user)| AdminBookingResponse {
            booking: BookingResponse::from(booking),
            student: PublicUser::from(student),
            tutor: TutorResponse::from_parts(profile, tutor_user),
        })
        .collect();
    Ok(Json(response))
}

// PATCH /api/admin/users/:id
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    super::authed_role(&state, &headers, Role::Admin)?;

    let user = {
        let db = state.db.lock().unwrap();
        admin::set_user_banned(&db, &id, req.is_banned, Utc::now())?
    };

    tracing::info!(user_id = %user.id, banned = user.is_banned, "updated user status");
    Ok(Json(AdminUserResponse::from(&user)))
}
