use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PublicUser, Role, User};
use crate::services::auth;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
    pub role: Role,
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let expires_at = Utc::now() + Duration::hours(state.config.token_ttl_hours);
    auth::mint_token(&state.config.token_secret, &user.id, expires_at)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to sign token")))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    // admin accounts are seeded, never self-registered
    let role = match Role::parse(&req.role) {
        Some(role @ (Role::Student | Role::Tutor)) => role,
        _ => {
            return Err(AppError::Validation(
                "role must be student or tutor".to_string(),
            ))
        }
    };

    let user = {
        let db = state.db.lock().unwrap();
        if queries::get_user_by_email(&db, &email)?.is_some() {
            return Err(AppError::Validation(
                "email is already registered".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash: auth::hash_password(&req.password),
            role,
            is_banned: false,
            banned_at: None,
            created_at: Utc::now().naive_utc(),
        };
        queries::create_user(&db, &user)?;
        user
    };

    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = %user.id, role = %user.role.as_str(), "registered user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
            role: user.role,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_email(&db, &email)?
    };
    let Some(user) = user else {
        return Err(AppError::Unauthorized);
    };
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
        role: user.role,
    }))
}
