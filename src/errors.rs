use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejections produced by the scheduling core. Every variant is detected
/// before any write; the message is what the HTTP layer sends back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid day name: {0}")]
    InvalidDay(String),

    #[error("invalid time format: {0} (expected HH:mm)")]
    InvalidTimeFormat(String),

    #[error("start time must be before end time on {0}")]
    InvalidTimeRange(String),

    #[error("overlapping availability slots on {0}")]
    OverlappingSlots(String),

    #[error("unrecognized field: {0}")]
    InvalidField(String),

    #[error("invalid session date provided")]
    InvalidDate,

    #[error("cannot book sessions in the past")]
    PastBooking,

    #[error("tutor is not available on this day")]
    NoAvailability,

    #[error("this time is already booked, please try another session")]
    SlotTaken,

    #[error("booking is already completed")]
    AlreadyCompleted,

    #[error("cannot complete a cancelled booking")]
    CannotCompleteCancelled,

    #[error("tutor profile not found")]
    TutorProfileNotFound,
}

impl ScheduleError {
    fn status(&self) -> StatusCode {
        match self {
            ScheduleError::OverlappingSlots(_)
            | ScheduleError::SlotTaken
            | ScheduleError::AlreadyCompleted
            | ScheduleError::CannotCompleteCancelled => StatusCode::CONFLICT,
            ScheduleError::TutorProfileNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Schedule(e) => e.status(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
