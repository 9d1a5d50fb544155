pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod reviews;
pub mod tutors;

use axum::http::HeaderMap;
use chrono::Utc;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services;
use crate::state::AppState;

/// Resolves the bearer token to a live user row. Missing, malformed,
/// expired, or orphaned tokens all read as unauthorized; banned users are
/// turned away with a 403 whatever they ask for.
pub(crate) fn authed_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or("");

    let user_id = services::auth::verify_token(&state.config.token_secret, token, Utc::now())
        .ok_or(AppError::Unauthorized)?;

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user(&db, &user_id)?.ok_or(AppError::Unauthorized)?
    };
    if user.is_banned {
        return Err(AppError::Forbidden(
            "your account has been banned".to_string(),
        ));
    }
    Ok(user)
}

pub(crate) fn authed_role(
    state: &AppState,
    headers: &HeaderMap,
    role: Role,
) -> Result<User, AppError> {
    let user = authed_user(state, headers)?;
    if user.role != role {
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}
