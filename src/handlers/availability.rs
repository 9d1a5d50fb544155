use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Role, SlotBatch, SlotPatch, SlotView};
use crate::services::{availability, tutors};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BatchResponse {
    pub created: usize,
}

// GET /api/tutors/availability/me
pub async fn list_my_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let slots = {
        let db = state.db.lock().unwrap();
        let profile = tutors::require_profile(&db, &user.id)?;
        availability::list_for_tutor(&db, &profile.id)?
    };
    Ok(Json(slots.iter().map(SlotView::from).collect()))
}

// PUT /api/tutors/availability — full rewrite
pub async fn replace_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(batch): Json<SlotBatch>,
) -> Result<Json<BatchResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;
    let normalized = availability::normalize_slot_batch(batch)?;

    let created = {
        let db = state.db.lock().unwrap();
        let profile = tutors::require_profile(&db, &user.id)?;
        availability::replace_all(&db, &profile.id, &normalized)?
    };

    tracing::info!(user_id = %user.id, created, "replaced availability");
    Ok(Json(BatchResponse { created }))
}

// POST /api/tutors/availability — additive merge
pub async fn add_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(batch): Json<SlotBatch>,
) -> Result<Json<BatchResponse>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;
    let normalized = availability::normalize_slot_batch(batch)?;

    let created = {
        let db = state.db.lock().unwrap();
        let profile = tutors::require_profile(&db, &user.id)?;
        availability::reconcile(&db, &profile.id, &normalized)?
    };
    Ok(Json(BatchResponse { created }))
}

// PATCH /api/tutors/availability/:id
pub async fn update_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slot_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SlotView>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;
    let patch = SlotPatch::from_value(&body)?;

    let slot = {
        let db = state.db.lock().unwrap();
        let profile = tutors::require_profile(&db, &user.id)?;
        availability::update_one(&db, &profile.id, &slot_id, patch)?
    };
    Ok(Json(SlotView::from(&slot)))
}

// DELETE /api/tutors/availability/:id
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slot_id): Path<String>,
) -> Result<Json<SlotView>, AppError> {
    let user = super::authed_role(&state, &headers, Role::Tutor)?;

    let slot = {
        let db = state.db.lock().unwrap();
        let profile = tutors::require_profile(&db, &user.id)?;
        availability::remove_one(&db, &profile.id, &slot_id)?
    };
    Ok(Json(SlotView::from(&slot)))
}
