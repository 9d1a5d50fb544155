use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Review, Role};
use crate::services::reviews;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub tutor_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

// POST /api/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let user = super::authed_role(&state, &headers, Role::Student)?;

    let review = {
        let db = state.db.lock().unwrap();
        reviews::create_review(&db, &user.id, &req.tutor_id, req.rating, req.comment)?
    };
    Ok((StatusCode::CREATED, Json(review)))
}
